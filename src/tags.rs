/// Splits raw tag input on runs of commas and whitespace, dropping empties and lowercasing.
pub fn parse_tags(raw: &str) -> impl Iterator<Item = String> + '_ {
    raw.split(|c: char| c == ',' || c.is_whitespace())
        .filter(|v| !v.is_empty())
        .map(str::to_lowercase)
}

/// Adds tags that aren't present yet. Existing order is kept and new tags go to the end.
pub fn merge_tags(tags: &mut Vec<String>, new_tags: impl IntoIterator<Item = String>) {
    for tag in new_tags {
        if !tags.contains(&tag) {
            tags.push(tag);
        }
    }
}

pub fn dedup_tags(tags: impl IntoIterator<Item = String>) -> Vec<String> {
    let mut unique = Vec::new();
    merge_tags(&mut unique, tags);
    unique
}
