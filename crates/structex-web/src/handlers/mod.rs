pub mod extract;

#[cfg(test)]
mod tests;
