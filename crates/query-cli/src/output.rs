use serde::Serialize;
use std::io::Write;

pub fn print_json<T: Serialize>(value: &T, pretty: bool) -> anyhow::Result<()> {
    let json = if pretty {
        serde_json::to_string_pretty(value)?
    } else {
        serde_json::to_string(value)?
    };
    println!("{json}");
    Ok(())
}

/// One record per line, or a single indented array with `pretty`.
pub fn print_records<T: Serialize>(records: &[T], pretty: bool) -> anyhow::Result<()> {
    if pretty {
        return print_json(&records, true);
    }

    let mut out = std::io::stdout().lock();
    for record in records {
        serde_json::to_writer(&mut out, record)?;
        writeln!(out)?;
    }
    out.flush()?;
    Ok(())
}
