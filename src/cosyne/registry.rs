/// Hands out ids for slots and layers. Owned by whoever builds the layers, so two
/// independently constructed networks never share a counter.
#[derive(Debug, Default, Clone)]
pub struct IdRegistry {
    next_id: u32,
}

impl IdRegistry {
    pub fn starting_at(first_id: u32) -> IdRegistry {
        IdRegistry { next_id: first_id }
    }

    pub fn next_id(&mut self) -> u32 {
        let id = self.next_id;
        self.next_id = self.next_id.wrapping_add(1);
        id
    }

    pub fn issued(&self) -> u32 {
        self.next_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_sequential_per_registry() {
        let mut a = IdRegistry::default();
        let mut b = IdRegistry::starting_at(10);
        assert_eq!(a.next_id(), 0);
        assert_eq!(a.next_id(), 1);
        assert_eq!(b.next_id(), 10);
        assert_eq!(a.issued(), 2);
        assert_eq!(b.issued(), 11);
    }
}
