use crate::domain::error::VaultError;
use crate::domain::models::{ErrorBody, ErrorOut, JsonOut};
use serde::Serialize;

pub fn print_out<T: Serialize>(
    json: bool,
    data: &[T],
    row: impl Fn(&T) -> String,
) -> anyhow::Result<()> {
    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&JsonOut { ok: true, data })?
        );
    } else {
        for d in data {
            println!("{}", row(d));
        }
    }
    Ok(())
}

pub fn print_one<T: Serialize>(json: bool, data: T, row: impl Fn(&T) -> String) -> anyhow::Result<()> {
    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&JsonOut { ok: true, data })?
        );
    } else {
        println!("{}", row(&data));
    }
    Ok(())
}

/// Failure envelope: `{ "ok": false, "error": { "code", "message" } }` with a
/// stable code when the cause is a `VaultError`, `INTERNAL` otherwise.
pub fn print_error(json: bool, err: &anyhow::Error) {
    let code = err
        .downcast_ref::<VaultError>()
        .map(VaultError::code)
        .unwrap_or("INTERNAL");
    if json {
        let body = ErrorOut {
            ok: false,
            error: ErrorBody {
                code: code.to_string(),
                message: format!("{err:#}"),
            },
        };
        match serde_json::to_string_pretty(&body) {
            Ok(out) => println!("{out}"),
            Err(_) => eprintln!("error: {err:#}"),
        }
    } else {
        eprintln!("error: {err:#}");
    }
}
