use csv::{ReaderBuilder, Trim};

/// One parsed line; empty cells are `None`.
pub type Cells = Vec<Option<String>>;

/// Splits raw feed text into rows of trimmed cells.
///
/// `\r\n`, `\r` and `\n` all end a line, blank lines are dropped and rows may
/// have any number of cells. Quotes are plain text, so a stray one never spans
/// lines. Rows the reader cannot decode are skipped.
pub fn parse_rows(text: &str) -> Vec<Cells> {
  let mut reader = ReaderBuilder::new()
    .has_headers(false)
    .flexible(true)
    .trim(Trim::All)
    .quoting(false)
    .from_reader(text.as_bytes());

  reader
    .records()
    .filter_map(Result::ok)
    .map(|record| record.iter().map(cell).collect::<Cells>())
    .filter(|cells| cells.iter().any(Option::is_some))
    .collect()
}

fn cell(value: &str) -> Option<String> {
  if value.is_empty() {
    None
  } else {
    Some(value.to_string())
  }
}
