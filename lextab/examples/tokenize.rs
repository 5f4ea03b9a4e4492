use std::io::{self, Read};

use lextab::lexer::Lexer;

/// A small driver loop over the lexer: reads stdin (or a built-in
/// sample) and prints one `id >lexeme<` line per recognized token.
fn main() -> Result<(), Box<dyn std::error::Error>> {
    let lexer = Lexer::builder()
        .define("[0-9]+", 1)?
        .define("[a-zA-Z_][a-zA-Z_0-9]*", 2)?
        .define("\"[^\"]*\"", 3)?
        .define("[=+*/<>()-]", 4)?
        .define("[ \t\r\n]+", 5)?
        .build()?;

    let mut input = String::new();
    io::stdin().read_to_string(&mut input)?;
    if input.is_empty() {
        input = "print(\"result\") x42 = 7 * (n + 1)".into();
    }

    for token in lexer.tokens(input.as_str()) {
        println!("{} >{}<", token.id(), &input[token.range()]);
    }
    Ok(())
}
