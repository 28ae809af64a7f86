use super::Report;
use regex::Regex;
use std::collections::BTreeMap;

/// Named captures extracted from a matched path.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PathParams(BTreeMap<String, String>);

impl PathParams {
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.get(name).map(String::as_str)
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.0.insert(name.into(), value.into());
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteMatch {
    pub report: Report,
    pub params: PathParams,
}

/// Ordered list of path bindings; the first matching pattern wins.
#[derive(Debug, Clone)]
pub struct ReportRouter {
    bindings: Vec<(Regex, Report)>,
}

const BINDINGS: &[(&str, Report)] = &[
    (r"^/stations$", Report::ActiveStations),
    (
        r"^/station/(?<stationId>[^/]+)/water-level/(?<date>[0-9]{8})/verified$",
        Report::WaterLevelVerified,
    ),
    (
        r"^/station/(?<stationId>[^/]+)/water-level/(?<date>[0-9]{8})/preliminary$",
        Report::WaterLevelPreliminary,
    ),
    (
        r"^/station/(?<stationId>[^/]+)/water-level/(?<date>[0-9]{8})/predicted$",
        Report::WaterLevelPredicted,
    ),
    (
        r"^/station/(?<stationId>[^/]+)/extrema/(?<date>[0-9]{8})/predicted$",
        Report::ExtremaPredicted,
    ),
];

impl ReportRouter {
    pub fn new() -> Self {
        let bindings = BINDINGS
            .iter()
            .map(|(pattern, report)| {
                (
                    Regex::new(pattern).expect("route patterns are valid"),
                    *report,
                )
            })
            .collect();

        Self { bindings }
    }

    pub fn resolve(&self, path: &str) -> Option<RouteMatch> {
        self.bindings.iter().find_map(|(regex, report)| {
            let captures = regex.captures(path)?;
            let mut params = PathParams::default();
            for name in regex.capture_names().flatten() {
                if let Some(m) = captures.name(name) {
                    params.insert(name, m.as_str());
                }
            }
            Some(RouteMatch {
                report: *report,
                params,
            })
        })
    }
}

impl Default for ReportRouter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolves_every_report() {
        let router = ReportRouter::new();
        let cases = [
            ("/stations", Report::ActiveStations),
            ("/station/9447130/water-level/20200101/verified", Report::WaterLevelVerified),
            ("/station/9447130/water-level/20200101/preliminary", Report::WaterLevelPreliminary),
            ("/station/9447130/water-level/20200101/predicted", Report::WaterLevelPredicted),
            ("/station/9447130/extrema/20200101/predicted", Report::ExtremaPredicted),
        ];

        for (path, report) in cases {
            let matched = router.resolve(path).unwrap_or_else(|| panic!("{path} should match"));
            assert_eq!(matched.report, report);
        }
    }

    #[test]
    fn test_extracts_named_params() {
        let router = ReportRouter::new();
        let matched = router
            .resolve("/station/9447130/extrema/20200101/predicted")
            .unwrap();

        assert_eq!(matched.params.get("stationId"), Some("9447130"));
        assert_eq!(matched.params.get("date"), Some("20200101"));
        assert_eq!(matched.params.get("missing"), None);
    }

    #[test]
    fn test_rejects_unknown_and_malformed_paths() {
        let router = ReportRouter::new();
        for path in [
            "/",
            "/stations/",
            "/station/9447130/water-level/2020011/verified",
            "/station/9447130/water-level/20200101/observed",
            "/station//water-level/20200101/verified",
            "/station/a/b/water-level/20200101/verified",
            "/station/9447130/extrema/20200101/verified",
        ] {
            assert!(router.resolve(path).is_none(), "{path} should not match");
        }
    }
}
