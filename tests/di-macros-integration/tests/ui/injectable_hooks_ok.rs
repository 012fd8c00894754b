use di_abstractions::{DynError, Injectable};
use di_macros::Injectable;

#[derive(Injectable)]
#[injectable(post_construct = "connect", pre_destroy = "disconnect", no_register)]
pub struct Connection {
    retries: u32,
}

impl Connection {
    fn connect(&self) -> Result<(), DynError> {
        Ok(())
    }

    fn disconnect(&self) -> Result<(), std::fmt::Error> {
        Ok(())
    }
}

fn main() {
    let descriptor = Connection::descriptor();
    assert!(descriptor.has_lifecycle());
    assert_eq!(descriptor.constructors()[0].name(), "default");
}
