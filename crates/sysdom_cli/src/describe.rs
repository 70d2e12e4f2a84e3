//! `sysdom describe`: print a demo's descriptor tree.

use sysdom_ir::DesignDescriptor;
use sysdom_sim::Kernel;

use crate::{demo, DescribeArgs};

/// Runs the `sysdom describe` command.
pub fn run(args: &DescribeArgs) -> Result<i32, Box<dyn std::error::Error>> {
    println!("{}", render(args)?);
    Ok(0)
}

fn render(args: &DescribeArgs) -> Result<String, Box<dyn std::error::Error>> {
    let design = elaborated(args)?;
    if args.fingerprint {
        return Ok(design.fingerprint()?.to_string());
    }
    Ok(if args.compact {
        serde_json::to_string(&design)?
    } else {
        serde_json::to_string_pretty(&design)?
    })
}

/// Elaborates without running so processes registered by component hooks
/// are part of the snapshot.
fn elaborated(args: &DescribeArgs) -> Result<DesignDescriptor, Box<dyn std::error::Error>> {
    let mut kernel = Kernel::default();
    demo::build(args.demo, &mut kernel)?;
    kernel.elaborate()?;
    Ok(kernel.describe()?)
}
