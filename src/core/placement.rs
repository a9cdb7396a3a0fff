//! Block placement normalization.
//!
//! Rewrites the layout around a metadata block so repeated stamping settles
//! on one stable shape: shebang (when the filetype has one) pinned to line
//! 0, exactly one blank line between shebang and block, block de-indented,
//! exactly one blank line between block and the remaining content. The
//! transform is a fixpoint: `normalize_layout(normalize_layout(x)) ==
//! normalize_layout(x)`.

#[derive(Debug, Clone)]
pub struct PlacementPolicy {
    /// Pin a leading `#!` line to line 0 and exclude it from reflow.
    pub allow_shebang: bool,
    /// Keep non-blank content found above the block (license headers) in
    /// place; when false such content rejoins the body below the block.
    pub allow_license_header: bool,
    /// Cap on the blank run before the block when the block is not forced
    /// to the top.
    pub max_blank_lines_before_block: usize,
    /// Collapse blank runs around the block.
    pub normalize_blank_lines: bool,
    /// Re-emit the block at the top of the file.
    pub enforce_block_at_top: bool,
}

impl Default for PlacementPolicy {
    fn default() -> Self {
        PlacementPolicy {
            allow_shebang: false,
            allow_license_header: false,
            max_blank_lines_before_block: 1,
            normalize_blank_lines: true,
            enforce_block_at_top: true,
        }
    }
}

/// Normalizes the layout of `text` around the `open`/`close` delimited
/// block. Without a block, only shebang pinning and leading-blank-line
/// stripping apply.
pub fn normalize_layout(
    text: &str,
    open: &str,
    close: &str,
    policy: &PlacementPolicy,
) -> String {
    let lines: Vec<String> = text.lines().map(|l| l.to_string()).collect();

    match find_block(&lines, open, close) {
        Some((start, end)) => {
            let mut pre: Vec<String> = lines[..start].to_vec();
            let block: Vec<String> = lines[start..=end]
                .iter()
                .map(|l| l.trim_start().to_string())
                .collect();
            let mut post: Vec<String> = lines[end + 1..].to_vec();

            let shebang = extract_shebang(&mut pre, &mut post, policy);

            if policy.enforce_block_at_top {
                let mut header: Vec<String> =
                    pre.into_iter().filter(|l| !l.trim().is_empty()).collect();
                if !policy.allow_license_header && !header.is_empty() {
                    header.extend(post);
                    post = header;
                    header = Vec::new();
                }
                strip_leading_blanks(&mut post);

                let mut out: Vec<String> = Vec::new();
                if let Some(s) = shebang {
                    out.push(s);
                    out.push(String::new());
                }
                if !header.is_empty() {
                    out.extend(header);
                    out.push(String::new());
                }
                out.extend(block);
                if !post.is_empty() {
                    out.push(String::new());
                    out.extend(post);
                }
                join(out)
            } else {
                if policy.normalize_blank_lines {
                    let mut run = 0usize;
                    while pre.last().is_some_and(|l| l.trim().is_empty()) {
                        pre.pop();
                        run += 1;
                    }
                    for _ in 0..run.min(policy.max_blank_lines_before_block) {
                        pre.push(String::new());
                    }
                }
                strip_leading_blanks(&mut post);

                let mut out: Vec<String> = Vec::new();
                if let Some(s) = shebang {
                    out.push(s);
                    out.push(String::new());
                }
                out.extend(pre);
                out.extend(block);
                if !post.is_empty() {
                    out.push(String::new());
                    out.extend(post);
                }
                join(out)
            }
        }
        None => {
            let mut rest = lines;
            let shebang = if policy.allow_shebang
                && rest.first().is_some_and(|l| l.starts_with("#!"))
            {
                Some(rest.remove(0))
            } else {
                None
            };
            strip_leading_blanks(&mut rest);

            let mut out: Vec<String> = Vec::new();
            if let Some(s) = shebang {
                out.push(s);
                if !rest.is_empty() {
                    out.push(String::new());
                }
            }
            out.extend(rest);
            join(out)
        }
    }
}

/// Locates the first open/close delimiter pair, tolerating per-line leading
/// indentation. Returns the inclusive line range of the block.
pub fn find_block(lines: &[String], open: &str, close: &str) -> Option<(usize, usize)> {
    let start = lines.iter().position(|l| l.trim() == open)?;
    let end = lines[start + 1..]
        .iter()
        .position(|l| l.trim() == close)?
        + start
        + 1;
    Some((start, end))
}

fn extract_shebang(
    pre: &mut Vec<String>,
    post: &mut Vec<String>,
    policy: &PlacementPolicy,
) -> Option<String> {
    if !policy.allow_shebang {
        return None;
    }
    if pre.first().is_some_and(|l| l.starts_with("#!")) {
        return Some(pre.remove(0));
    }
    // A shebang displaced below the block (fresh stamps prepend the block
    // to the whole body) is pulled back to the top.
    let idx = post.iter().position(|l| !l.trim().is_empty())?;
    if post[idx].starts_with("#!") {
        return Some(post.remove(idx));
    }
    None
}

fn strip_leading_blanks(lines: &mut Vec<String>) {
    while lines.first().is_some_and(|l| l.trim().is_empty()) {
        lines.remove(0);
    }
}

fn join(lines: Vec<String>) -> String {
    if lines.is_empty() {
        return String::new();
    }
    let mut out = lines.join("\n");
    out.push('\n');
    out
}
