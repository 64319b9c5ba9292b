//! Log path helpers.

/// Add `suffix` before the extension of `path`, or bump a counter if the
/// suffix is already there. Paths without an extension are returned
/// unchanged.
///
/// # Examples
///
/// ```
/// use cyclelog_wpilog::add_path_suffix;
///
/// assert_eq!(add_path_suffix("logs/a.wpilog", "_sim"), "logs/a_sim.wpilog");
/// assert_eq!(add_path_suffix("logs/a_sim.wpilog", "_sim"), "logs/a_sim_2.wpilog");
/// assert_eq!(add_path_suffix("logs/a_sim_2.wpilog", "_sim"), "logs/a_sim_3.wpilog");
/// ```
pub fn add_path_suffix(path: &str, suffix: &str) -> String {
    let name_start = path.rfind(['/', '\\']).map_or(0, |i| i + 1);
    let Some(dot) = path[name_start..].rfind('.').map(|i| name_start + i) else {
        return path.to_owned();
    };
    let (base, extension) = path.split_at(dot);
    if base.ends_with(suffix) {
        return format!("{base}_2{extension}");
    }
    if let Some((head, counter)) = base.rsplit_once('_') {
        let numbered = !counter.is_empty() && counter.bytes().all(|b| b.is_ascii_digit());
        if numbered && head.len() > suffix.len() && head.ends_with(suffix) {
            if let Ok(n) = counter.parse::<u64>() {
                return format!("{head}_{}{extension}", n + 1);
            }
        }
    }
    format!("{base}{suffix}{extension}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn adds_suffix_first_time() {
        assert_eq!(add_path_suffix("a.wpilog", "_sim"), "a_sim.wpilog");
    }

    #[test]
    fn bumps_existing_counter() {
        assert_eq!(add_path_suffix("a_sim_9.wpilog", "_sim"), "a_sim_10.wpilog");
    }

    #[test]
    fn no_extension_is_unchanged() {
        assert_eq!(add_path_suffix("logs.d/readme", "_sim"), "logs.d/readme");
    }

    #[test]
    fn numbered_name_without_suffix_gets_suffix() {
        assert_eq!(add_path_suffix("run_3.wpilog", "_sim"), "run_3_sim.wpilog");
    }

    #[test]
    fn only_last_dot_counts() {
        assert_eq!(add_path_suffix("a.b.wpilog", "_replay"), "a.b_replay.wpilog");
    }
}
