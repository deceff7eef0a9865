//! Dispatch-table properties exercised through the public API.

use std::sync::Arc;
use std::thread;

use rayon::prelude::*;

use regeq::config::target::TargetConfig;
use regeq::lower::{lower_units, Amd64RegionEqualsLowering, CompilationUnit};
use regeq::{
    catch_internal_error, kernel, registry, select, ComparisonRequest, DirectSlot, Length,
    Selection, Stride,
};

/// Every stride/mask/index combination the selector can be handed.
fn all_requests(target: &TargetConfig) -> Vec<ComparisonRequest> {
    let mut out = Vec::new();
    for a in Stride::ALL {
        for b in Stride::ALL {
            for mask in [None, Some(Stride::S1), Some(Stride::S2), Some(Stride::S4)] {
                for length in [Length::Dynamic, Length::Constant(8), Length::Constant(512)] {
                    for dynamic in [false, true] {
                        out.push(ComparisonRequest::for_target(
                            target, a, b, mask, length, dynamic,
                        ));
                    }
                }
            }
        }
    }
    out
}

/// The combinations a kernel exists for.
fn supported(r: &ComparisonRequest) -> bool {
    match r.stride_mask {
        None => true,
        Some(m) if m == r.stride_b => true,
        Some(m) => {
            m == Stride::S1
                && r.stride_b == Stride::S2
                && (r.stride_a == Stride::S1 || r.stride_a == Stride::S2)
        }
    }
}

#[test]
fn kernel_table_layout() {
    let table = registry().render_table();
    insta::assert_snapshot!(table.trim_end(), @r"
 0  arrayRegionEqualsS1S1            (object, i64, object, i64, ptr, i32) -> bool  pure
 1  arrayRegionEqualsS1S2            (object, i64, object, i64, ptr, i32) -> bool  pure
 2  arrayRegionEqualsS1S4            (object, i64, object, i64, ptr, i32) -> bool  pure
 3  arrayRegionEqualsS2S1            (object, i64, object, i64, ptr, i32) -> bool  pure
 4  arrayRegionEqualsS2S2            (object, i64, object, i64, ptr, i32) -> bool  pure
 5  arrayRegionEqualsS2S4            (object, i64, object, i64, ptr, i32) -> bool  pure
 6  arrayRegionEqualsS4S1            (object, i64, object, i64, ptr, i32) -> bool  pure
 7  arrayRegionEqualsS4S2            (object, i64, object, i64, ptr, i32) -> bool  pure
 8  arrayRegionEqualsS4S4            (object, i64, object, i64, ptr, i32) -> bool  pure
 9  arrayRegionEqualsDynamicStrides  (object, i64, object, i64, ptr, i32, i32) -> bool  pure
10  arrayRegionEqualsS1S2S1          (object, i64, object, i64, ptr, i32) -> bool  pure
11  arrayRegionEqualsS2S2S1          (object, i64, object, i64, ptr, i32) -> bool  pure
");
}

#[test]
fn never_picks_a_wrong_width_kernel() {
    let target = TargetConfig::x86_64_v3();
    for request in all_requests(&target) {
        let outcome = catch_internal_error("matrix", || select(&target, &request));
        match outcome {
            Ok(Selection::Inline) => {
                assert!(request.direct_index >= 0, "{:?}", request);
                assert!(request.length.as_constant().is_some(), "{:?}", request);
            }
            Ok(Selection::Call(kernel)) => {
                assert!(supported(&request), "{:?} -> {}", request, kernel.name);
                let expected = match request.stride_mask {
                    Some(m) if m != request.stride_b => {
                        format!("arrayRegionEquals{}{}{}", request.stride_a, request.stride_b, m)
                    }
                    _ if request.direct_index < 0 => "arrayRegionEqualsDynamicStrides".to_string(),
                    _ => format!("arrayRegionEquals{}{}", request.stride_a, request.stride_b),
                };
                assert_eq!(kernel.name, expected, "{:?}", request);
            }
            Err(d) => {
                assert!(d.is_internal());
                assert!(!supported(&request), "{:?}: {}", request, d.message);
            }
        }
    }
}

#[test]
fn concurrent_selection_is_deterministic() {
    kernel::init();
    let target = Arc::new(TargetConfig::x86_64_v4());
    let requests: Arc<Vec<ComparisonRequest>> = Arc::new(
        all_requests(&target)
            .into_iter()
            .filter(supported)
            .collect(),
    );
    let expected: Vec<Selection> = requests.iter().map(|r| select(&target, r)).collect();

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let target = Arc::clone(&target);
            let requests = Arc::clone(&requests);
            thread::spawn(move || {
                requests
                    .iter()
                    .rev()
                    .map(|r| select(&target, r))
                    .collect::<Vec<_>>()
            })
        })
        .collect();

    for handle in handles {
        let mut got = handle.join().unwrap();
        got.reverse();
        assert_eq!(got, expected);
    }

    let parallel: Vec<Selection> = requests.par_iter().map(|r| select(&target, r)).collect();
    assert_eq!(parallel, expected);
}

#[test]
fn direct_slots_match_registry() {
    for slot in DirectSlot::ALL {
        let kernel = registry().direct(slot);
        assert_eq!(registry().slot_of(kernel.name), Some(slot.index()));
    }
}

#[test]
fn parallel_units_keep_order() {
    let lowering = Amd64RegionEqualsLowering::new(TargetConfig::x86_64_v2());
    let target = lowering.target().clone();
    let units: Vec<CompilationUnit> = (0..64)
        .map(|i| {
            let mask = if i % 7 == 0 { Some(Stride::S4) } else { None };
            CompilationUnit::new(
                format!("unit{}", i),
                vec![ComparisonRequest::for_target(
                    &target,
                    Stride::S2,
                    Stride::S2,
                    mask,
                    Length::Dynamic,
                    false,
                )],
            )
        })
        .collect();

    let results = lower_units(&lowering, &units);
    for (i, result) in results.iter().enumerate() {
        if i % 7 == 0 {
            assert!(result.is_err(), "unit{} should fail", i);
        } else {
            let lines = result.as_ref().unwrap();
            assert_eq!(lines[0], format!("unit{}:", i));
            assert_eq!(lines.last().unwrap(), "call arrayRegionEqualsS2S2");
        }
    }
}
