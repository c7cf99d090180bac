//! Directory group membership filtering

use std::collections::BTreeMap;

/// Lower-cased common name of a distinguished name (`CN=Lab.FRIB.Ops,OU=...`)
pub fn common_name(dn: &str) -> String {
    let first = dn.split(',').next().unwrap_or_default().trim();
    let name = match first.get(..3) {
        Some(prefix) if prefix.eq_ignore_ascii_case("cn=") => &first[3..],
        _ => first,
    };
    name.to_lowercase()
}

/// Keep memberships whose common name starts with `prefix`, each followed by
/// its configured alias. No group is listed twice.
pub fn filter_groups(
    member_of: &[String],
    prefix: &str,
    aliases: &BTreeMap<String, String>,
) -> Vec<String> {
    let mut output: Vec<String> = Vec::new();
    for dn in member_of {
        let group = common_name(dn);
        if !group.starts_with(prefix) {
            continue;
        }
        let alias = aliases.get(&group).cloned();
        if !output.contains(&group) {
            output.push(group);
        }
        if let Some(alias) = alias {
            if !output.contains(&alias) {
                output.push(alias);
            }
        }
    }
    output
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_common_name() {
        assert_eq!(common_name("CN=Lab.FRIB.Ops,OU=Groups,DC=x"), "lab.frib.ops");
        assert_eq!(common_name("cn=solo"), "solo");
    }

    #[test]
    fn test_filter_prefix_and_aliases() {
        let dns: Vec<String> = [
            "CN=LAB.FRIB.Ops,OU=G",
            "CN=Domain Users,OU=G",
            "CN=lab.frib.cryo,OU=G",
            "CN=lab.frib.ops,OU=Other",
        ]
        .iter()
        .map(|s| s.to_string())
        .collect();
        let mut aliases = BTreeMap::new();
        aliases.insert("lab.frib.cryo".to_string(), "lab.frib.ops".to_string());
        aliases.insert("lab.frib.ops".to_string(), "lab.frib.all".to_string());

        let groups = filter_groups(&dns, "lab.frib", &aliases);
        assert_eq!(groups, vec!["lab.frib.ops", "lab.frib.all", "lab.frib.cryo"]);
    }
}
