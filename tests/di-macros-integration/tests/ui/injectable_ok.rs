use di_abstractions::{Injectable, Provider};
use di_macros::Injectable;
use std::sync::Arc;

pub trait Repository: Send + Sync {}

#[derive(Injectable)]
#[injectable(provides = "dyn Repository")]
pub struct MemoryRepository;

impl Repository for MemoryRepository {}

#[derive(Injectable)]
pub struct Service {
    #[inject]
    repository: Arc<dyn Repository>,
    #[inject(named = "fallback")]
    fallback: Option<Arc<dyn Repository>>,
    #[inject]
    lazy: Provider<MemoryRepository>,
    calls: u64,
}

fn main() {
    let descriptor = Service::descriptor();
    assert_eq!(descriptor.constructors().len(), 1);
    assert_eq!(descriptor.constructors()[0].parameters().len(), 3);
    assert!(descriptor.constructors()[0].is_injectable());
    let _ = MemoryRepository::descriptor();
}
