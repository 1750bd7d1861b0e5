/// Every cell index whose block id equals `target`, in ascending order.
pub fn locate(types: &[u8], target: u8) -> Vec<usize> {
    types
        .iter()
        .enumerate()
        .filter(|&(_, &id)| id == target)
        .map(|(index, _)| index)
        .collect()
}
