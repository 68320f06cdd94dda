use uuid::Uuid;

pub trait IdGenerator {
    fn next_id(&self) -> String;
}

/// Random v4 UUIDs in hyphenated form. Collisions are treated as impossible,
/// so created products are written without an existence check.
#[derive(Debug, Default, Clone, Copy)]
pub struct UuidV4Generator;

impl IdGenerator for UuidV4Generator {
    fn next_id(&self) -> String {
        Uuid::new_v4().to_string()
    }
}
