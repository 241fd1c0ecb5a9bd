//! `crucible explain` - classify and explain a TLS error message.

use anyhow::Result;

use crate::args::ExplainArgs;

pub fn execute(args: &ExplainArgs) -> Result<()> {
    println!("{}", crucible_ssl::explain(&args.message));
    Ok(())
}
