//! Peer block mutation: append a stanza, remove the stanza matching an
//! address. Edits are pure line-vector operations; unrelated lines are
//! preserved verbatim and in order.

/// Append a peer stanza with a name comment. Ensures one blank separator line
/// before the stanza and leaves one after it. Not idempotent: calling twice
/// with the same arguments produces two blocks.
pub fn append_peer(lines: &mut Vec<String>, name: &str, public_key: &str, address: &str) {
    if lines.last().is_some_and(|l| !l.trim().is_empty()) {
        lines.push(String::new());
    }
    lines.push(format!("# {name}"));
    lines.push("[Peer]".to_string());
    lines.push(format!("PublicKey = {public_key}"));
    lines.push(format!("AllowedIPs = {address}/32"));
    lines.push(String::new());
}

/// Remove the first peer block whose text contains `AllowedIPs = <address>/32`,
/// together with its immediately preceding comment lines. Returns whether a
/// block matched; a miss leaves the lines untouched and is not an error.
///
/// Matching is a literal substring search over the joined block text, not a
/// field comparison. A block whose comment happens to contain that exact
/// substring would be misidentified; kept for compatibility with existing
/// deployments (first match wins).
pub fn remove_peer(lines: &mut Vec<String>, address: &str) -> bool {
    let markers: Vec<usize> = lines
        .iter()
        .enumerate()
        .filter(|(_, l)| l.trim() == "[Peer]")
        .map(|(i, _)| i)
        .collect();
    if markers.is_empty() {
        return false;
    }

    let needle = format!("AllowedIPs = {address}/32");
    for (idx, &marker) in markers.iter().enumerate() {
        let end = markers.get(idx + 1).copied().unwrap_or(lines.len());
        let mut start = marker;
        while start > 0 && lines[start - 1].trim().starts_with('#') {
            start -= 1;
        }
        if lines[start..end].join("\n").contains(&needle) {
            lines.drain(start..end);
            return true;
        }
    }
    false
}
