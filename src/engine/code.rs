use rand::Rng;

/// Six ASCII digits, uniformly drawn. Codes are scoped to one record, so a
/// collision with another pickup's code is harmless.
pub fn generate_pickup_code() -> String {
    format!("{:06}", rand::thread_rng().gen_range(0..1_000_000u32))
}
