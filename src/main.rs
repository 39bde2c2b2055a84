use std::error::Error;

fn main() -> Result<(), Box<dyn Error>> {
    repolens::cli::main()
}
