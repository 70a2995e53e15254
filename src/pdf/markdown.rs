//! Shapes plain extracted PDF text into Markdown.
//!
//! Each page becomes a section; sections are divided by a horizontal rule. Blank lines delimit
//! paragraphs; lines inside a paragraph are joined and hyphenated line breaks are rejoined.
//! Short standalone upper-case lines are treated as headings.

const PAGE_RULE: &str = "\n\n---\n\n";
const MAX_HEADING_CHARS: usize = 80;

/// Convert the extracted text of each page, in document order, into Markdown.
///
/// Pages without any text are skipped.
pub fn pages_to_markdown<S: AsRef<str>>(pages: &[S]) -> String {
    let pages: Vec<String> = pages
        .iter()
        .map(|page| render_page(page.as_ref()))
        .filter(|page| !page.is_empty())
        .collect();

    if pages.is_empty() {
        return String::new();
    }

    let mut markdown = pages.join(PAGE_RULE);
    markdown.push('\n');
    markdown
}

fn render_page(page: &str) -> String {
    paragraphs(page)
        .into_iter()
        .map(|lines| render_paragraph(&lines))
        .collect::<Vec<_>>()
        .join("\n\n")
}

fn paragraphs(page: &str) -> Vec<Vec<String>> {
    let mut blocks = Vec::new();
    let mut current: Vec<String> = Vec::new();

    for line in page.lines() {
        let normalized = collapse_whitespace(line);
        if normalized.is_empty() {
            if !current.is_empty() {
                blocks.push(std::mem::take(&mut current));
            }
        } else {
            current.push(normalized);
        }
    }
    if !current.is_empty() {
        blocks.push(current);
    }
    blocks
}

fn render_paragraph(lines: &[String]) -> String {
    if let [line] = lines
        && is_heading(line)
    {
        return format!("## {line}");
    }

    let mut joined = String::new();
    for line in lines {
        if joined.is_empty() {
            joined.push_str(line);
        } else if ends_with_word_hyphen(&joined)
            && line.chars().next().is_some_and(char::is_lowercase)
        {
            joined.pop();
            joined.push_str(line);
        } else {
            joined.push(' ');
            joined.push_str(line);
        }
    }
    joined
}

fn is_heading(line: &str) -> bool {
    let mut letters = line.chars().filter(|c| c.is_alphabetic()).peekable();
    letters.peek().is_some()
        && line.chars().count() <= MAX_HEADING_CHARS
        && !line.ends_with(['.', ',', ';', ':'])
        && letters.all(char::is_uppercase)
}

fn ends_with_word_hyphen(text: &str) -> bool {
    let mut tail = text.chars().rev();
    tail.next() == Some('-') && tail.next().is_some_and(char::is_alphabetic)
}

fn collapse_whitespace(line: &str) -> String {
    line.split_whitespace().collect::<Vec<_>>().join(" ")
}
