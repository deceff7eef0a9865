use super::*;
use crate::stride::Stride;

#[test]
fn test_registry_has_twelve_slots() {
    assert_eq!(registry().len(), 12);
    assert_eq!(KERNEL_COUNT, 12);
    assert!(!registry().is_empty());
    assert!(registry().get(12).is_none());
}

#[test]
fn test_direct_slots_follow_stride_order() {
    let names = [
        "arrayRegionEqualsS1S1",
        "arrayRegionEqualsS1S2",
        "arrayRegionEqualsS1S4",
        "arrayRegionEqualsS2S1",
        "arrayRegionEqualsS2S2",
        "arrayRegionEqualsS2S4",
        "arrayRegionEqualsS4S1",
        "arrayRegionEqualsS4S2",
        "arrayRegionEqualsS4S4",
    ];
    for (i, name) in names.iter().enumerate() {
        assert_eq!(registry().get(i).unwrap().name, *name);
        assert_eq!(registry().direct(DirectSlot::ALL[i]).name, *name);
    }
}

#[test]
fn test_direct_kernel_name_matches_strides() {
    for slot in DirectSlot::ALL {
        let expected = format!("arrayRegionEquals{}{}", slot.stride_a(), slot.stride_b());
        assert_eq!(registry().direct(slot).name, expected);
    }
    assert_eq!(
        registry().direct(DirectSlot::new(Stride::S4, Stride::S2)).name,
        "arrayRegionEqualsS4S2"
    );
}

#[test]
fn test_named_slots() {
    let r = registry();
    assert_eq!(r.dynamic_strides().name, "arrayRegionEqualsDynamicStrides");
    assert_eq!(r.s1_s2_s1().name, "arrayRegionEqualsS1S2S1");
    assert_eq!(r.s2_s2_s1().name, "arrayRegionEqualsS2S2S1");
    assert_eq!(r.slot_of("arrayRegionEqualsDynamicStrides"), Some(9));
    assert_eq!(r.slot_of("arrayRegionEqualsS1S2S1"), Some(10));
    assert_eq!(r.slot_of("arrayRegionEqualsS2S2S1"), Some(11));
    assert_eq!(r.slot_of("memcmp"), None);
}

#[test]
fn test_every_kernel_is_pure() {
    for (slot, kernel) in registry().iter() {
        assert!(kernel.is_pure(), "slot {} must be pure", slot);
        assert_eq!(kernel.signature.result, ValueKind::Bool);
    }
}

#[test]
fn test_signatures() {
    for (slot, kernel) in registry().iter() {
        if slot == DYNAMIC_STRIDES_SLOT {
            assert_eq!(kernel.signature.params.len(), 7);
            assert!(kernel.signature.takes_stride_tag());
        } else {
            assert_eq!(kernel.signature.params.len(), 6);
            assert!(!kernel.signature.takes_stride_tag());
        }
    }
    assert_eq!(
        KernelSignature::region_equals().to_string(),
        "(object, i64, object, i64, ptr, i32) -> bool"
    );
}

#[test]
fn test_side_effecting_descriptor_is_not_pure() {
    let k = KernelDescriptor {
        name: "arrayRegionEqualsTraced",
        signature: KernelSignature::region_equals(),
        purity: Purity::SideEffecting,
    };
    assert!(!k.is_pure());
    assert_eq!(
        k.to_string(),
        "arrayRegionEqualsTraced(object, i64, object, i64, ptr, i32) -> bool"
    );
}

#[test]
fn test_registry_is_a_singleton() {
    init();
    let a = registry() as *const KernelRegistry;
    let b = registry() as *const KernelRegistry;
    assert_eq!(a, b);
}

#[test]
fn test_render_table_lists_all_slots() {
    let table = registry().render_table();
    assert_eq!(table.lines().count(), 12);
    assert!(table.lines().all(|l| l.ends_with("pure")));
    assert!(table.contains("arrayRegionEqualsDynamicStrides"));
}
