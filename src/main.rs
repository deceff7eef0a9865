use clap::{Parser, Subcommand};
use std::process;

use regeq::config::target::{FeatureSet, TargetConfig};
use regeq::lower::CompareOp;
use regeq::{catch_internal_error, kernel, ComparisonRequest, Length, Selector, Stride};

#[derive(Parser)]
#[command(
    name = "regeq",
    version,
    about = "Region-equality kernel selection for the x86-64 backend"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print the kernel table in slot order
    Table,
    /// Explain which kernel a comparison would call
    Select {
        /// Target (x86-64, x86-64-v2, x86-64-v3, x86-64-v4 or targets/<name>.toml)
        #[arg(long, default_value = "x86-64-v3")]
        target: String,
        /// Element width of operand A in bytes
        #[arg(long, value_parser = parse_stride)]
        stride_a: Stride,
        /// Element width of operand B in bytes
        #[arg(long, value_parser = parse_stride)]
        stride_b: Stride,
        /// Element width of the mask region (omit for an unmasked compare)
        #[arg(long, value_parser = parse_stride)]
        stride_mask: Option<Stride>,
        /// Constant element count (omit for a run-time length)
        #[arg(long)]
        length: Option<u32>,
        /// Strides are only known at run time
        #[arg(long)]
        dynamic_strides: bool,
        /// Extra CPU features checked at run time (comma-separated)
        #[arg(long, value_name = "LIST")]
        features: Option<String>,
    },
}

fn parse_stride(s: &str) -> Result<Stride, String> {
    Stride::parse(s).map_err(|d| d.message)
}

fn main() {
    env_logger::init();
    kernel::init();

    let cli = Cli::parse();
    match cli.command {
        Command::Table => print!("{}", kernel::registry().render_table()),
        Command::Select {
            target,
            stride_a,
            stride_b,
            stride_mask,
            length,
            dynamic_strides,
            features,
        } => {
            let target = match TargetConfig::resolve(&target) {
                Ok(t) => t,
                Err(d) => {
                    d.render(&target);
                    process::exit(1);
                }
            };
            let runtime = match features.as_deref().map(FeatureSet::parse).transpose() {
                Ok(f) => f.unwrap_or_default(),
                Err(d) => {
                    d.render(&target.name);
                    process::exit(1);
                }
            };
            let length = length.map_or(Length::Dynamic, Length::Constant);
            let request = ComparisonRequest::for_target(
                &target,
                stride_a,
                stride_b,
                stride_mask,
                length,
                dynamic_strides,
            )
            .with_runtime_features(&target, runtime);

            let selector = Selector::new(&target);
            let lowered =
                catch_internal_error("regeq select", || CompareOp::from_request(&selector, &request));
            match lowered {
                Ok(op) => {
                    println!("target:       {} ({})", target.display_name, target.features);
                    println!("direct index: {}", request.direct_index);
                    println!("vector width: {}", request.max_vector_width);
                    match &op {
                        CompareOp::InlineCompare { .. } => println!("selection:    inline"),
                        CompareOp::CallKernel { kernel, .. } => {
                            println!("selection:    call {}", kernel)
                        }
                    }
                    println!();
                    println!("{}", op);
                }
                Err(d) => {
                    d.render("regeq select");
                    process::exit(1);
                }
            }
        }
    }
}
