//! Ant style path patterns: `**` spans any number of segments, `*` and `?`
//! match within a single segment.

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    AnyPath,
    Glob(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathPattern {
    pattern: String,
    segments: Vec<Segment>,
}

impl PathPattern {
    pub fn new(pattern: &str) -> Self {
        let mut segments: Vec<Segment> = pattern
            .split('/')
            .filter(|segment| !segment.is_empty())
            .map(|segment| match segment {
                "**" => Segment::AnyPath,
                glob => Segment::Glob(glob.to_string()),
            })
            .collect();
        // `/**/**` matches the same paths as `/**`
        segments.dedup_by(|a, b| *a == Segment::AnyPath && *b == Segment::AnyPath);
        Self {
            pattern: pattern.to_string(),
            segments,
        }
    }

    pub fn as_str(&self) -> &str {
        &self.pattern
    }

    pub fn matches(&self, path: &str) -> bool {
        let path: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
        match_segments(&self.segments, &path)
    }
}

impl From<&str> for PathPattern {
    fn from(pattern: &str) -> Self {
        Self::new(pattern)
    }
}

/// Walks the pattern one segment at a time, tracking which path prefixes the
/// pattern read so far can match. Linear in pattern length times path depth.
fn match_segments(pattern: &[Segment], path: &[&str]) -> bool {
    // matched[j]: the pattern so far matches the first j path segments
    let mut matched = vec![false; path.len() + 1];
    matched[0] = true;

    for segment in pattern {
        match segment {
            Segment::AnyPath => {
                for j in 1..matched.len() {
                    matched[j] |= matched[j - 1];
                }
            }
            Segment::Glob(glob) => {
                for j in (1..matched.len()).rev() {
                    matched[j] = matched[j - 1] && glob_matches(glob, path[j - 1]);
                }
                matched[0] = false;
            }
        }
        if !matched.contains(&true) {
            return false;
        }
    }
    matched[path.len()]
}

fn glob_matches(glob: &str, text: &str) -> bool {
    let glob: Vec<char> = glob.chars().collect();
    let text: Vec<char> = text.chars().collect();
    let (mut g, mut t) = (0, 0);
    let mut backtrack: Option<(usize, usize)> = None;

    while t < text.len() {
        match glob.get(g) {
            Some('*') => {
                backtrack = Some((g, t));
                g += 1;
            }
            Some(c) if *c == '?' || *c == text[t] => {
                g += 1;
                t += 1;
            }
            _ => match backtrack {
                Some((star, matched)) => {
                    g = star + 1;
                    t = matched + 1;
                    backtrack = Some((star, matched + 1));
                }
                None => return false,
            },
        }
    }
    glob[g..].iter().all(|c| *c == '*')
}

/// Include/exclude pair: a path matches when an include pattern matches and
/// no exclude pattern does.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathMatchRule {
    include: Vec<PathPattern>,
    exclude: Vec<PathPattern>,
}

impl PathMatchRule {
    pub fn new<I: AsRef<str>, E: AsRef<str>>(include: &[I], exclude: &[E]) -> Self {
        Self {
            include: include.iter().map(|p| PathPattern::new(p.as_ref())).collect(),
            exclude: exclude.iter().map(|p| PathPattern::new(p.as_ref())).collect(),
        }
    }

    pub fn including<I, S>(patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            include: patterns
                .into_iter()
                .map(|p| PathPattern::new(p.as_ref()))
                .collect(),
            exclude: Vec::new(),
        }
    }

    pub fn excluding<I, S>(mut self, patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.exclude
            .extend(patterns.into_iter().map(|p| PathPattern::new(p.as_ref())));
        self
    }

    pub fn matches(&self, path: &str) -> bool {
        self.include.iter().any(|p| p.matches(path)) && !self.exclude.iter().any(|p| p.matches(path))
    }
}

impl Default for PathMatchRule {
    fn default() -> Self {
        Self::including(["/**"])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_include_only() {
        let rule = PathMatchRule::including(["/api/**"]);
        assert!(rule.matches("/api/x"));
        assert!(rule.matches("/api/x/y"));
        assert!(!rule.matches("/other"));
    }

    #[test]
    fn test_exclude_wins() {
        let rule = PathMatchRule::including(["/**"]).excluding(["/api/**"]);
        assert!(!rule.matches("/api/x"));
        assert!(rule.matches("/health"));
    }

    #[test]
    fn test_default_matches_everything() {
        let rule = PathMatchRule::default();
        assert!(rule.matches("/"));
        assert!(rule.matches("/subject-access-request"));
        assert!(rule.matches("/a/b/c"));
    }

    #[test]
    fn test_double_star_matches_bare_prefix() {
        let pattern = PathPattern::new("/health/**");
        assert!(pattern.matches("/health"));
        assert!(pattern.matches("/health/ping"));
        assert!(!pattern.matches("/healthcheck"));
    }

    #[test]
    fn test_single_segment_wildcards() {
        let pattern = PathPattern::new("/prisoner/*/booking");
        assert!(pattern.matches("/prisoner/A1234AA/booking"));
        assert!(!pattern.matches("/prisoner/A1234AA/other/booking"));

        let pattern = PathPattern::new("/swagger-ui*");
        assert!(pattern.matches("/swagger-ui.html"));
        assert!(!pattern.matches("/swagger"));

        let pattern = PathPattern::new("/v?/docs");
        assert!(pattern.matches("/v3/docs"));
        assert!(!pattern.matches("/v31/docs"));
    }

    #[test]
    fn test_literal_paths() {
        let pattern = PathPattern::new("/favicon.ico");
        assert!(pattern.matches("/favicon.ico"));
        assert!(!pattern.matches("/favicon.ico/x"));
        assert!(!pattern.matches("/favicon"));
    }

    #[test]
    fn test_double_star_in_the_middle() {
        let pattern = PathPattern::new("/api/**/details");
        assert!(pattern.matches("/api/details"));
        assert!(pattern.matches("/api/a/b/details"));
        assert!(!pattern.matches("/api/a/b"));
    }

    #[test]
    fn test_many_double_stars_on_deep_paths() {
        let pattern = PathPattern::new("/**/a/**/b/**/**/c/**/d/**/e/**/z");
        let deep = "/a/b/c/d/e".repeat(40);
        assert!(!pattern.matches(&deep));
        assert!(pattern.matches(&format!("{deep}/z")));

        assert_eq!(PathPattern::new("/api/**/**/x").segments.len(), 3);
    }

    #[test]
    fn test_new_from_config_lists() {
        let include = vec!["/api/**".to_string()];
        let exclude = vec!["/api/internal/**".to_string()];
        let rule = PathMatchRule::new(&include, &exclude);
        assert!(rule.matches("/api/public"));
        assert!(!rule.matches("/api/internal/x"));
    }
}
