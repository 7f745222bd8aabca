use anyhow::Result;

fn main() -> Result<()> {
    form_connector::main()
}
