//! Console menu for choosing a collection.

use crate::zotero::Collection;
use std::io::{self, BufRead, Write};

/// Print a 1-based numbered list of collection names.
pub fn print_menu<W: Write>(output: &mut W, collections: &[Collection]) -> io::Result<()> {
    writeln!(output, "Choose a collection to process:")?;
    for (i, collection) in collections.iter().enumerate() {
        writeln!(output, "{}. {}", i + 1, collection.name)?;
    }
    Ok(())
}

/// Prompt until the user enters a number between 1 and `count`.
///
/// Returns the 0-based index. Fails if input ends first.
pub fn prompt_choice<R: BufRead, W: Write>(
    input: &mut R,
    output: &mut W,
    count: usize,
) -> io::Result<usize> {
    let mut line = String::new();
    loop {
        write!(output, "Enter a number: ")?;
        output.flush()?;

        line.clear();
        if input.read_line(&mut line)? == 0 {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "no collection selected",
            ));
        }

        match line.trim().parse::<usize>() {
            Ok(choice) if (1..=count).contains(&choice) => return Ok(choice - 1),
            Ok(_) => writeln!(output, "Invalid choice, try again")?,
            Err(_) => writeln!(output, "Please enter a number")?,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn collections(n: usize) -> Vec<Collection> {
        (1..=n)
            .map(|i| Collection {
                key: format!("KEY{}", i),
                name: format!("Collection {}", i),
            })
            .collect()
    }

    #[test]
    fn menu_is_one_based() {
        let mut out = Vec::new();
        print_menu(&mut out, &collections(2)).unwrap();
        let out = String::from_utf8(out).unwrap();
        assert!(out.contains("1. Collection 1\n"));
        assert!(out.contains("2. Collection 2\n"));
    }

    #[test]
    fn reprompts_on_text_and_out_of_range() {
        let mut input = Cursor::new("abc\n99\n2\n");
        let mut out = Vec::new();
        let choice = prompt_choice(&mut input, &mut out, 3).unwrap();
        assert_eq!(choice, 1);

        let out = String::from_utf8(out).unwrap();
        assert_eq!(out.matches("Enter a number: ").count(), 3);
        assert_eq!(out.matches("Please enter a number").count(), 1);
        assert_eq!(out.matches("Invalid choice, try again").count(), 1);
    }

    #[test]
    fn zero_and_negative_are_rejected() {
        let mut input = Cursor::new("0\n-1\n 3 \n");
        let mut out = Vec::new();
        assert_eq!(prompt_choice(&mut input, &mut out, 3).unwrap(), 2);
    }

    #[test]
    fn eof_is_an_error() {
        let mut input = Cursor::new("abc\n");
        let mut out = Vec::new();
        let err = prompt_choice(&mut input, &mut out, 3).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::UnexpectedEof);
    }
}
