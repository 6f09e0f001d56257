//! Demonstrates weak observation of a shared object's lifetime

use tether_memory::{SharedHandle, WeakHandle};

fn report(observer: &WeakHandle<String>) {
    match observer.upgrade() {
        Some(session) => println!("session is live: {session}"),
        None => println!("session has expired"),
    }
}

fn main() {
    let session = SharedHandle::new(String::from("session #1"));
    let observer = session.downgrade();

    report(&observer);
    drop(session);
    report(&observer);
}
