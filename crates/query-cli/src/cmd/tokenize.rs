use anyhow::Result;
use query_core::tokenize;

use crate::output::print_json;

pub fn run(raw: &str, pretty: bool) -> Result<()> {
    print_json(&tokenize(raw.trim()), pretty)
}
