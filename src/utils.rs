use anyhow::{anyhow, bail, Context, Result};
use clap::builder::{
    styling::{AnsiColor, Effects},
    Styles,
};
use range_parser::parse;
use std::io::BufRead;
use std::time::Duration;

/// Parse a time limit string into Duration.
///
/// Supported formats:
/// - `"D-HH:MM:SS"`, `"D-HH:MM"`, `"D-HH"` — days plus hours (SLURM style)
/// - `"HH:MM:SS"` — hours:minutes:seconds
/// - `"MM:SS"` — minutes:seconds
/// - `"MM"` — minutes
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use glaunch::utils::parse_time_limit;
///
/// assert_eq!(parse_time_limit("30").unwrap(), Duration::from_secs(1800));
/// assert_eq!(parse_time_limit("30:45").unwrap(), Duration::from_secs(1845));
/// assert_eq!(parse_time_limit("2:30:45").unwrap(), Duration::from_secs(9045));
/// assert_eq!(parse_time_limit("1-02:00:00").unwrap(), Duration::from_secs(93600));
/// ```
pub fn parse_time_limit(time_str: &str) -> Result<Duration> {
    let time_str = time_str.trim();

    if let Some((days, rest)) = time_str.split_once('-') {
        let days = days
            .parse::<u64>()
            .context("Invalid days in D-HH:MM:SS format")?;
        let parts: Vec<&str> = rest.split(':').collect();
        if parts.len() > 3 {
            bail!("Invalid time format. Expected D-HH, D-HH:MM or D-HH:MM:SS");
        }

        let mut fields = [0u64; 3];
        for (field, part) in fields.iter_mut().zip(&parts) {
            *field = part
                .parse::<u64>()
                .context("Invalid hours, minutes or seconds in D-HH:MM:SS format")?;
        }
        let [hours, minutes, seconds] = fields;
        return duration_from_parts(days, hours, minutes, seconds);
    }

    let parts: Vec<&str> = time_str.split(':').collect();

    match parts.len() {
        1 => {
            // Minutes as a single number
            let val = time_str
                .parse::<u64>()
                .context("Invalid time format. Expected number of minutes")?;
            duration_from_parts(0, 0, val, 0)
        }
        2 => {
            let minutes = parts[0]
                .parse::<u64>()
                .context("Invalid minutes in MM:SS format")?;
            let seconds = parts[1]
                .parse::<u64>()
                .context("Invalid seconds in MM:SS format")?;
            duration_from_parts(0, 0, minutes, seconds)
        }
        3 => {
            let hours = parts[0]
                .parse::<u64>()
                .context("Invalid hours in HH:MM:SS format")?;
            let minutes = parts[1]
                .parse::<u64>()
                .context("Invalid minutes in HH:MM:SS format")?;
            let seconds = parts[2]
                .parse::<u64>()
                .context("Invalid seconds in HH:MM:SS format")?;
            duration_from_parts(0, hours, minutes, seconds)
        }
        _ => Err(anyhow!(
            "Invalid time format. Expected formats: D-HH:MM:SS, HH:MM:SS, MM:SS, or MM"
        )),
    }
}

fn duration_from_parts(days: u64, hours: u64, minutes: u64, seconds: u64) -> Result<Duration> {
    days.checked_mul(86400)
        .and_then(|total| total.checked_add(hours.checked_mul(3600)?))
        .and_then(|total| total.checked_add(minutes.checked_mul(60)?))
        .and_then(|total| total.checked_add(seconds))
        .map(Duration::from_secs)
        .ok_or_else(|| anyhow!("Time limit is too large"))
}

/// Format a duration the way `sbatch --time` expects it.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use glaunch::utils::format_slurm_time;
///
/// assert_eq!(format_slurm_time(Duration::from_secs(1845)), "00:30:45");
/// assert_eq!(format_slurm_time(Duration::from_secs(475200)), "5-12:00:00");
/// ```
pub fn format_slurm_time(duration: Duration) -> String {
    let total_secs = duration.as_secs();
    let days = total_secs / 86400;
    let hours = (total_secs % 86400) / 3600;
    let minutes = (total_secs % 3600) / 60;
    let seconds = total_secs % 60;

    if days > 0 {
        format!("{days}-{hours:02}:{minutes:02}:{seconds:02}")
    } else {
        format!("{hours:02}:{minutes:02}:{seconds:02}")
    }
}

/// Parse memory limit string into megabytes.
///
/// Supported formats:
/// - `"100G"`, `"100g"` or `"100GB"` — gigabytes (converted to MB)
/// - `"1024M"`, `"1024m"` or `"1024MB"` — megabytes
/// - `"100"` — megabytes (default unit)
///
/// # Examples
///
/// ```
/// use glaunch::utils::parse_memory_limit;
///
/// assert_eq!(parse_memory_limit("100").unwrap(), 100);
/// assert_eq!(parse_memory_limit("1024M").unwrap(), 1024);
/// assert_eq!(parse_memory_limit("2G").unwrap(), 2048);
/// assert_eq!(parse_memory_limit("32GB").unwrap(), 32768);
/// ```
pub fn parse_memory_limit(memory_str: &str) -> Result<u64> {
    let mut memory_str = memory_str.trim();

    if memory_str.is_empty() {
        return Err(anyhow!("Memory limit cannot be empty"));
    }

    // "32GB" / "512mb"
    if memory_str.len() > 2 && (memory_str.ends_with('B') || memory_str.ends_with('b')) {
        memory_str = &memory_str[..memory_str.len() - 1];
    }

    if memory_str.ends_with('G') || memory_str.ends_with('g') {
        let value = memory_str[..memory_str.len() - 1]
            .trim()
            .parse::<u64>()
            .context("Invalid memory value in GB format")?;
        value
            .checked_mul(1024)
            .ok_or_else(|| anyhow!("Memory limit is too large"))
    } else if memory_str.ends_with('M') || memory_str.ends_with('m') {
        let value = memory_str[..memory_str.len() - 1]
            .trim()
            .parse::<u64>()
            .context("Invalid memory value in MB format")?;
        Ok(value)
    } else {
        memory_str
            .parse::<u64>()
            .context("Invalid memory format. Expected formats: 100G, 1024M, or 100 (MB)")
    }
}

/// Format memory in MB for `sbatch --mem`. Whole gigabytes use `G`, anything
/// else stays exact in `M`.
///
/// # Examples
///
/// ```
/// use glaunch::utils::format_slurm_memory;
///
/// assert_eq!(format_slurm_memory(32768), "32G");
/// assert_eq!(format_slurm_memory(1500), "1500M");
/// assert_eq!(format_slurm_memory(1030), "1030M");
/// ```
pub fn format_slurm_memory(memory_mb: u64) -> String {
    if memory_mb > 0 && memory_mb % 1024 == 0 {
        format!("{}G", memory_mb / 1024)
    } else {
        format!("{memory_mb}M")
    }
}

/// Format memory in MB for display (e.g., `"2.5G"`, `"1024M"`, `"512M"`).
///
/// # Examples
///
/// ```
/// use glaunch::utils::format_memory;
///
/// assert_eq!(format_memory(100), "100M");
/// assert_eq!(format_memory(1024), "1G");
/// assert_eq!(format_memory(2560), "2.5G");
/// ```
pub fn format_memory(memory_mb: u64) -> String {
    if memory_mb >= 1024 {
        let gb = memory_mb as f64 / 1024.0;
        if gb.fract() < 0.01 {
            format!("{:.0}G", gb)
        } else {
            format!("{:.1}G", gb)
        }
    } else {
        format!("{}M", memory_mb)
    }
}

/// Parse GPU indices from string inputs, supporting ranges like "0-2" or comma-separated "0,1,2".
///
/// # Examples
///
/// ```
/// use glaunch::utils::parse_gpu_indices;
///
/// assert_eq!(parse_gpu_indices("0").unwrap(), vec![0]);
/// assert_eq!(parse_gpu_indices("0,2,4").unwrap(), vec![0, 2, 4]);
/// assert_eq!(parse_gpu_indices("0-2").unwrap(), vec![0, 1, 2]);
/// assert_eq!(parse_gpu_indices("0-1,3").unwrap(), vec![0, 1, 3]);
/// ```
pub fn parse_gpu_indices(gpu_string: &str) -> Result<Vec<u32>> {
    let mut parsed: Vec<u32> = parse::<u32>(gpu_string.trim())
        .context(format!("Invalid GPU index or range: {}", gpu_string))?;

    parsed.sort_unstable();
    parsed.dedup();

    Ok(parsed)
}

/// Read one command per line. Blank lines and `#` comments are skipped.
///
/// # Examples
///
/// ```
/// use glaunch::utils::read_commands;
///
/// let input = "python train.py --lr 0.1\n\n# baseline\npython train.py --lr 0.01\n";
/// assert_eq!(
///     read_commands(input.as_bytes()).unwrap(),
///     vec!["python train.py --lr 0.1", "python train.py --lr 0.01"]
/// );
/// ```
pub fn read_commands<R: BufRead>(reader: R) -> Result<Vec<String>> {
    let mut commands = Vec::new();
    for line in reader.lines() {
        let line = line.context("Failed to read command list")?;
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        commands.push(line.to_string());
    }
    Ok(commands)
}

pub const STYLES: Styles = Styles::styled()
    .header(AnsiColor::Green.on_default().effects(Effects::BOLD))
    .usage(AnsiColor::Green.on_default().effects(Effects::BOLD))
    .literal(AnsiColor::Cyan.on_default().effects(Effects::BOLD))
    .placeholder(AnsiColor::Cyan.on_default());

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_gpu_indices_comma_separated() {
        assert_eq!(parse_gpu_indices("0,2,4").unwrap(), vec![0, 2, 4]);
        // Test unsorted input gets sorted
        assert_eq!(parse_gpu_indices("3,1,2").unwrap(), vec![1, 2, 3]);
    }

    #[test]
    fn test_parse_gpu_indices_mixed() {
        assert_eq!(parse_gpu_indices("0-1,3,5-6").unwrap(), vec![0, 1, 3, 5, 6]);
        assert_eq!(parse_gpu_indices("0-2,1-3").unwrap(), vec![0, 1, 2, 3]);
    }

    #[test]
    fn test_parse_gpu_indices_whitespace() {
        assert_eq!(parse_gpu_indices("  0-2  ").unwrap(), vec![0, 1, 2]);
    }

    #[test]
    fn test_parse_gpu_indices_invalid() {
        assert!(parse_gpu_indices("").is_err());
        assert!(parse_gpu_indices("abc").is_err());
        assert!(parse_gpu_indices("gpu0").is_err());
        assert!(parse_gpu_indices("-1").is_err());
    }

    #[test]
    fn test_parse_time_limit_with_days() {
        assert_eq!(
            parse_time_limit("5-12:00:00").unwrap(),
            Duration::from_secs(5 * 86400 + 12 * 3600)
        );
        assert_eq!(
            parse_time_limit("2-06").unwrap(),
            Duration::from_secs(2 * 86400 + 6 * 3600)
        );
        assert_eq!(
            parse_time_limit("0-01:30").unwrap(),
            Duration::from_secs(5400)
        );
    }

    #[test]
    fn test_parse_time_limit_invalid() {
        assert!(parse_time_limit("").is_err());
        assert!(parse_time_limit("x-01:00:00").is_err());
        assert!(parse_time_limit("1-01:00:00:00").is_err());
        assert!(parse_time_limit("1:2:3:4").is_err());
    }

    #[test]
    fn test_parse_time_limit_overflow_is_an_error() {
        assert!(parse_time_limit("999999999999999999-0").is_err());
        assert!(parse_time_limit("18446744073709551615").is_err());
        assert!(parse_time_limit("1-18446744073709551615:00:00").is_err());
    }

    #[test]
    fn test_slurm_time_roundtrips_config_default() {
        let limit = parse_time_limit("5-12:00:00").unwrap();
        assert_eq!(format_slurm_time(limit), "5-12:00:00");
    }

    #[test]
    fn test_parse_memory_limit_suffixes() {
        assert_eq!(parse_memory_limit("32GB").unwrap(), 32 * 1024);
        assert_eq!(parse_memory_limit("512mb").unwrap(), 512);
        assert_eq!(parse_memory_limit(" 4g ").unwrap(), 4096);
        assert!(parse_memory_limit("").is_err());
        assert!(parse_memory_limit("lots").is_err());
        assert!(parse_memory_limit("B").is_err());
        assert!(parse_memory_limit("18446744073709551615G").is_err());
    }

    #[test]
    fn test_format_slurm_memory_is_exact() {
        assert_eq!(format_slurm_memory(1500), "1500M");
        assert_eq!(format_slurm_memory(1030), "1030M");
        assert_eq!(format_slurm_memory(2560), "2560M");
        assert_eq!(format_slurm_memory(2048), "2G");
        assert_eq!(format_slurm_memory(0), "0M");
    }

    #[test]
    fn test_read_commands_keeps_order_and_metacharacters() {
        let input = "  echo a | tee x  \n#skip\n\necho b && echo c\n";
        assert_eq!(
            read_commands(input.as_bytes()).unwrap(),
            vec!["echo a | tee x", "echo b && echo c"]
        );
    }
}
