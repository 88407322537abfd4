/// Show how to build your own diagnostics, without having to use the
/// `fancy` feature or having `main()` return `miette::Result`
use miette::Diagnostic;
use yamlcfg::YamlDocument;

#[derive(Debug)]
pub struct MyError {
    pub message: String,
}

fn parse(input: &str) -> Result<YamlDocument, MyError> {
    input.parse::<YamlDocument>().map_err(|error| {
        let help = error.help().map(|h| h.to_string()).unwrap_or_default();
        let column = match error.source_code().map(|src| src.read_span(&error.span, 0, 0)) {
            // miette uses 0 based indexes, but humans prefer 1-based
            Some(Ok(contents)) => contents.column() + 1,
            _ => 1,
        };
        let message = format!(
            "line {}, column {}: {}\n  help: {}",
            error.line, column, error.kind, help
        );
        MyError { message }
    })
}

fn main() {
    let input = r#"server:
  host: localhost
  ports: [ 80, [ 443 ] ]
"#;
    match parse(input) {
        Ok(_) => eprintln!("unexpectedly parsed"),
        Err(err) => eprintln!("{}", err.message),
    }
    // Output:
    //  line 3, column 1: Mismatched brackets in flow sequence
    //    help: Flow sequences cannot nest and close with a single `]`.
}
