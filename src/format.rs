//! C3: the partial-index / final-index line grammar.
//!
//! ```text
//! Term:<term>,PostingList:[df:<df>,Postings:[<P1>,<P2>,...]]\n
//! Posting(docid:<d>,tf:<t>,fields:[title:<b>,heading:<b>,bold:<b>,strong:<b>,italics:<b>,emphasized:<b>],termPositions:[<p1>,<p2>,...])
//! ```
//!
//! This is a hand-rolled recursive-descent-style scanner, not a regex
//! re-parse of the format: the grammar is fixed and has no escaping, so a
//! regex buys convenience at the cost of being a second, looser description
//! of the contract. A malformed line returns `None` rather than erroring —
//! callers skip it silently, per the error-handling design.

use crate::posting::{DocId, Fields, Posting, PostingList};

/// Parse one line (with or without its trailing newline) into `(term,
/// posting list)`. Returns `None` on any grammar mismatch.
pub fn parse_line(line: &str) -> Option<(String, PostingList)> {
    let line = line.trim_end_matches(['\n', '\r']);
    let rest = line.strip_prefix("Term:")?;
    let (term, rest) = split_at_first(rest, ',')?;
    if term.is_empty() {
        return None;
    }
    let rest = rest.strip_prefix("PostingList:[df:")?;
    let (df_str, rest) = split_at_first(rest, ',')?;
    let declared_df: usize = df_str.parse().ok()?;
    let rest = rest.strip_prefix("Postings:[")?;
    let body = rest.strip_suffix("]]")?;

    let postings = parse_postings(body)?;
    if postings.len() != declared_df {
        return None;
    }
    Some((term.to_string(), PostingList::from_sorted(postings)))
}

/// Quick scan of just the leading `Term:<term>,` prefix, used by the
/// meta-index builder which only needs the key, not the full parse, for
/// every line in the final index.
pub fn term_of(line: &str) -> Option<String> {
    let rest = line.strip_prefix("Term:")?;
    let (term, rest) = split_at_first(rest, ',')?;
    if term.is_empty() || !rest.starts_with("PostingList:[") {
        return None;
    }
    Some(term.to_string())
}

fn parse_postings(body: &str) -> Option<Vec<Posting>> {
    let mut postings = Vec::new();
    let mut rest = body;
    loop {
        if rest.is_empty() {
            break;
        }
        let after = rest.strip_prefix("Posting(")?;
        let close = after.find(')')?;
        let inner = &after[..close];
        postings.push(parse_posting_inner(inner)?);
        rest = &after[close + 1..];
        if let Some(stripped) = rest.strip_prefix(',') {
            rest = stripped;
        } else if rest.is_empty() {
            break;
        } else {
            return None;
        }
    }
    // The grammar requires postings to already be docid-sorted on disk; a
    // malformed ordering is still a malformed line.
    if postings.windows(2).any(|w| w[0].docid >= w[1].docid) {
        return None;
    }
    Some(postings)
}

fn parse_posting_inner(inner: &str) -> Option<Posting> {
    let rest = inner.strip_prefix("docid:")?;
    let (docid_str, rest) = split_at_first(rest, ',')?;
    let docid: DocId = docid_str.parse().ok()?;

    let rest = rest.strip_prefix("tf:")?;
    let (tf_str, rest) = split_at_first(rest, ',')?;
    let tf: u32 = tf_str.parse().ok()?;

    let rest = rest.strip_prefix("fields:[title:")?;
    let (title, rest) = split_bool(rest, ',')?;
    let rest = rest.strip_prefix("heading:")?;
    let (heading, rest) = split_bool(rest, ',')?;
    let rest = rest.strip_prefix("bold:")?;
    let (bold, rest) = split_bool(rest, ',')?;
    let rest = rest.strip_prefix("strong:")?;
    let (strong, rest) = split_bool(rest, ',')?;
    let rest = rest.strip_prefix("italics:")?;
    let (italics, rest) = split_bool(rest, ',')?;
    let rest = rest.strip_prefix("emphasized:")?;
    let (emphasized, rest) = split_bool(rest, ']')?;

    let rest = rest.strip_prefix(",termPositions:[")?;
    let positions_str = rest.strip_suffix(']')?;
    if positions_str.is_empty() {
        // The grammar requires at least one position.
        return None;
    }
    let mut term_positions = Vec::new();
    for part in positions_str.split(',') {
        term_positions.push(part.parse::<u32>().ok()?);
    }
    if term_positions.windows(2).any(|w| w[0] >= w[1]) {
        return None;
    }

    Some(Posting {
        docid,
        tf,
        fields: Fields {
            title,
            heading,
            bold,
            strong,
            italics,
            emphasized,
        },
        term_positions,
    })
}

fn split_at_first(s: &str, delim: char) -> Option<(&str, &str)> {
    let idx = s.find(delim)?;
    Some((&s[..idx], &s[idx + delim.len_utf8()..]))
}

fn split_bool(s: &str, delim: char) -> Option<(bool, &str)> {
    let (value, rest) = split_at_first(s, delim)?;
    let b = match value {
        "True" => true,
        "False" => false,
        _ => return None,
    };
    Some((b, rest))
}

/// Emit one line (newline-terminated) for `term`'s posting list, in the
/// exact grammar `parse_line` accepts.
pub fn write_line(term: &str, list: &PostingList) -> String {
    let mut out = String::new();
    out.push_str("Term:");
    out.push_str(term);
    out.push_str(",PostingList:[df:");
    out.push_str(&list.df().to_string());
    out.push_str(",Postings:[");
    for (i, posting) in list.postings().iter().enumerate() {
        if i > 0 {
            out.push(',');
        }
        write_posting(&mut out, posting);
    }
    out.push_str("]]\n");
    out
}

fn write_posting(out: &mut String, posting: &Posting) {
    out.push_str("Posting(docid:");
    out.push_str(&posting.docid.to_string());
    out.push_str(",tf:");
    out.push_str(&posting.tf.to_string());
    out.push_str(",fields:[title:");
    out.push_str(bool_str(posting.fields.title));
    out.push_str(",heading:");
    out.push_str(bool_str(posting.fields.heading));
    out.push_str(",bold:");
    out.push_str(bool_str(posting.fields.bold));
    out.push_str(",strong:");
    out.push_str(bool_str(posting.fields.strong));
    out.push_str(",italics:");
    out.push_str(bool_str(posting.fields.italics));
    out.push_str(",emphasized:");
    out.push_str(bool_str(posting.fields.emphasized));
    out.push_str("],termPositions:[");
    for (i, p) in posting.term_positions.iter().enumerate() {
        if i > 0 {
            out.push(',');
        }
        out.push_str(&p.to_string());
    }
    out.push_str("])");
}

fn bool_str(b: bool) -> &'static str {
    if b {
        "True"
    } else {
        "False"
    }
}
