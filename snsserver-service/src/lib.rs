pub mod posts;
pub mod uploads;

#[cfg(test)]
mod memory;
