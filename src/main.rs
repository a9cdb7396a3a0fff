use std::process;

fn main() {
    match omnistamp::run() {
        Ok(code) => process::exit(code),
        Err(e) => {
            eprintln!("omnistamp: {}", e);
            process::exit(2);
        }
    }
}
