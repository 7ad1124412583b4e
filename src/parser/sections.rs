use super::lines::Line;

/// What a heading does once the scanner is inside the target section.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SectionExit {
    /// The next heading ends the whole scan.
    StopAtNextHeading,
    /// Headings only reassign the current section; scanning runs to the end.
    Reassign,
}

/// Walk classified lines and return the non-empty text lines that sit inside
/// the section labelled `target`. Heading lines are never returned.
pub fn gate_section<'a>(lines: &[Line<'a>], target: &str, exit: SectionExit) -> Vec<&'a str> {
    let mut gated = Vec::new();
    let mut current: Option<&str> = None;

    for line in lines {
        match *line {
            Line::Heading { label } => {
                if exit == SectionExit::StopAtNextHeading && current == Some(target) {
                    break;
                }
                current = Some(label);
            }
            Line::Text(text) if current == Some(target) => gated.push(text),
            Line::Text(_) | Line::Empty => {}
        }
    }

    gated
}
