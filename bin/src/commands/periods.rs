//! Periods command implementation.

use candela_lib::prelude::*;

/// Print every supported period identifier.
pub(crate) fn list_periods() {
    println!("{:<8} {:<10}", "ID", "KIND");
    println!("{}", "-".repeat(20));

    for period in Period::all() {
        let kind = match period.intraday_minutes() {
            Some(minutes) => format!("{minutes} min"),
            None => "calendar".to_string(),
        };
        println!("{:<8} {:<10}", period, kind);
    }
}
