#[endpoint_exposed]
pub trait CrudService<T> {
    fn list(&self) -> Vec<T> {
        Vec::new()
    }

    fn save(&self, value: T) -> T {
        value
    }
}
