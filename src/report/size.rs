// src/report/size.rs
// Human-readable byte counts: "1023 bytes", "1.10 Kb", "7.89 Mb".

const UNITS: [&str; 6] = ["bytes", "Kb", "Mb", "Gb", "Tb", "Pb"];

pub fn format_size(bytes: u64) -> String {
    let mut size = bytes as f64;
    let mut unit = 0;
    while size >= 1024.0 && unit < UNITS.len() - 1 {
        size /= 1024.0;
        unit += 1;
    }

    if unit == 0 {
        format!("{} {}", bytes, UNITS[0])
    } else {
        format!("{:.2} {}", size, UNITS[unit])
    }
}
