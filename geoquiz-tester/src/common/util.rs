use anyhow::{Result, bail};
use geoquiz_game::RegionFilter;

pub fn split_csv(s: &str) -> Vec<String> {
    s.split(',')
        .map(|x| x.trim().to_string())
        .filter(|x| !x.is_empty())
        .collect()
}

/// Parse `all`, `group:<name>` or `district:<name>`.
pub fn parse_filter(raw: &str) -> Result<RegionFilter> {
    let raw = raw.trim();
    if raw.is_empty() || raw.eq_ignore_ascii_case("all") {
        return Ok(RegionFilter::All);
    }
    match raw.split_once(':') {
        Some((kind, name)) if !name.trim().is_empty() => match kind.trim() {
            "group" | "kraj" => Ok(RegionFilter::Group(name.trim().to_string())),
            "district" | "okres" => Ok(RegionFilter::District(name.trim().to_string())),
            other => bail!("unknown filter kind '{other}' (expected group or district)"),
        },
        _ => bail!(
            "invalid filter '{raw}' (expected all, group:<name> or district:<name>)"
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_csv_trims_and_filters() {
        let parts = split_csv(" alpha, ,beta,  gamma ");
        assert_eq!(parts, vec!["alpha", "beta", "gamma"]);
    }

    #[test]
    fn filters_parse_both_vocabularies() {
        assert_eq!(parse_filter("all").unwrap(), RegionFilter::All);
        assert_eq!(parse_filter("").unwrap(), RegionFilter::All);
        assert_eq!(
            parse_filter("group: Zlínský kraj").unwrap(),
            RegionFilter::Group("Zlínský kraj".into())
        );
        assert_eq!(
            parse_filter("okres:Tábor").unwrap(),
            RegionFilter::District("Tábor".into())
        );
        assert!(parse_filter("county:Kent").is_err());
        assert!(parse_filter("group:").is_err());
    }
}
