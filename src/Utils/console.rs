//! Integer prompts on stdin. The generator asks two questions per run
//! (data split, overwrite confirmation); anything that does not parse as an
//! integer re-prompts.

use std::io::{self, BufRead, Write};

/// Parse one reply line; surrounding whitespace is ignored.
pub fn parse_choice(line: &str) -> Option<i64> {
    line.trim().parse::<i64>().ok()
}

/// Prompt on stdout and read integers from stdin until one parses.
pub fn int_input(prompt: &str) -> i64 {
    let stdin = io::stdin();
    loop {
        print!("{} ", prompt);
        io::stdout().flush().ok();
        let mut line = String::new();
        if stdin.lock().read_line(&mut line).is_err() {
            continue;
        }
        if let Some(choice) = parse_choice(&line) {
            return choice;
        }
        println!("Please enter an integer.");
    }
}

#[cfg(test)]
mod tests {
    use super::parse_choice;

    #[test]
    fn test_parse_choice() {
        assert_eq!(parse_choice("1"), Some(1));
        assert_eq!(parse_choice(" 0 \n"), Some(0));
        assert_eq!(parse_choice("-3"), Some(-3));
        assert_eq!(parse_choice("yes"), None);
        assert_eq!(parse_choice(""), None);
        assert_eq!(parse_choice("1.5"), None);
    }
}
