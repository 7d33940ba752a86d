use crate::error::Result;
use crate::pipeline::Breakdown;

pub fn run(data_dir: Option<&str>, by: Breakdown) -> Result<()> {
    let ctx = super::load_context(data_dir)?;
    for value in ctx.options(by)? {
        println!("{value}");
    }
    Ok(())
}
