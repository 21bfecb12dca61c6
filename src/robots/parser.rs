//! Robots.txt parser implementation
//!
//! Parses the Allow/Disallow rule groups of a robots.txt file for one user
//! agent and answers path queries with longest-prefix-match precedence.

use chrono::{DateTime, Utc};

/// One User-agent group and its rules
#[derive(Debug, Default)]
struct RuleGroup {
    agents: Vec<String>,
    allow: Vec<String>,
    disallow: Vec<String>,
}

/// Parsed robots.txt policy for a single origin
///
/// Holds the rules from the group that applies to the crawl's user agent
/// (a specifically named group beats the `*` group). A policy with no rules
/// allows everything, which is also the fallback when robots.txt could not
/// be fetched.
#[derive(Debug, Clone)]
pub struct RobotsPolicy {
    /// Origin this policy governs (`scheme://host[:port]`)
    origin: String,
    /// Path prefixes from Allow directives
    allow_rules: Vec<String>,
    /// Path prefixes from Disallow directives
    disallow_rules: Vec<String>,
    /// When the policy was created
    pub fetched_at: DateTime<Utc>,
}

impl RobotsPolicy {
    /// Creates a permissive policy that allows every path
    ///
    /// Used when robots.txt is absent, unreachable, or unreadable.
    pub fn allow_all(origin: &str) -> Self {
        Self {
            origin: origin.to_string(),
            allow_rules: Vec::new(),
            disallow_rules: Vec::new(),
            fetched_at: Utc::now(),
        }
    }

    /// Parses robots.txt content into a policy for the given user agent
    ///
    /// Rule groups are selected per the robots exclusion protocol: the group
    /// whose `User-agent` token is the longest substring of `user_agent`
    /// wins; the `*` group is the fallback. Empty `Disallow:` lines (which
    /// mean "allow everything") are ignored.
    ///
    /// # Arguments
    ///
    /// * `origin` - The origin the content was fetched from
    /// * `content` - Raw robots.txt text
    /// * `user_agent` - The crawl's user agent string
    pub fn parse(origin: &str, content: &str, user_agent: &str) -> Self {
        let groups = parse_groups(content);
        let agent_lower = user_agent.to_lowercase();

        // Longest agent token contained in our user agent wins; "*" is the
        // weakest possible match.
        let mut best: Option<(usize, &RuleGroup)> = None;
        for group in &groups {
            for agent in &group.agents {
                let score = if agent == "*" {
                    Some(0)
                } else if agent_lower.contains(agent.as_str()) {
                    Some(agent.len())
                } else {
                    None
                };
                if let Some(score) = score {
                    if best.map_or(true, |(s, _)| score > s) {
                        best = Some((score, group));
                    }
                }
            }
        }

        match best {
            Some((_, group)) => Self {
                origin: origin.to_string(),
                allow_rules: group.allow.clone(),
                disallow_rules: group.disallow.clone(),
                fetched_at: Utc::now(),
            },
            None => Self::allow_all(origin),
        }
    }

    /// The origin this policy governs
    pub fn origin(&self) -> &str {
        &self.origin
    }

    /// Checks whether a path is allowed
    ///
    /// The most specific (longest) matching rule wins; at equal length an
    /// Allow rule beats a Disallow rule. A path no rule matches is allowed.
    pub fn is_allowed(&self, path: &str) -> bool {
        let path = if path.is_empty() { "/" } else { path };

        let mut best_len = 0usize;
        let mut allowed = true;

        for rule in &self.allow_rules {
            if path.starts_with(rule.as_str()) && rule.len() >= best_len {
                best_len = rule.len();
                allowed = true;
            }
        }
        for rule in &self.disallow_rules {
            if path.starts_with(rule.as_str()) && rule.len() > best_len {
                best_len = rule.len();
                allowed = false;
            }
        }

        allowed
    }
}

/// Splits robots.txt content into User-agent groups
///
/// Consecutive `User-agent` lines share the rule block that follows them;
/// a `User-agent` line after a rule line opens a new group.
fn parse_groups(content: &str) -> Vec<RuleGroup> {
    let mut groups: Vec<RuleGroup> = Vec::new();
    let mut accepting_agents = false;

    for line in content.lines() {
        let line = match line.split_once('#') {
            Some((before, _)) => before.trim(),
            None => line.trim(),
        };
        if line.is_empty() {
            continue;
        }

        let Some((key, value)) = line.split_once(':') else {
            continue;
        };
        let key = key.trim().to_lowercase();
        let value = value.trim();

        match key.as_str() {
            "user-agent" => {
                if accepting_agents {
                    if let Some(group) = groups.last_mut() {
                        group.agents.push(value.to_lowercase());
                    }
                } else {
                    groups.push(RuleGroup {
                        agents: vec![value.to_lowercase()],
                        ..RuleGroup::default()
                    });
                    accepting_agents = true;
                }
            }
            "allow" | "disallow" => {
                accepting_agents = false;
                // Rules before any User-agent line have no group to live in
                let Some(group) = groups.last_mut() else {
                    continue;
                };
                if value.is_empty() {
                    continue;
                }
                if key == "allow" {
                    group.allow.push(value.to_string());
                } else {
                    group.disallow.push(value.to_string());
                }
            }
            _ => {}
        }
    }

    groups
}
