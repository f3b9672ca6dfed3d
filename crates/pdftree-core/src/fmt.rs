/// Indentation unit for the dump: two spaces per depth level.
pub fn indent(depth: usize) -> String {
    format!("{:width$}", "", width = depth * 2)
}

#[cfg(test)]
mod tests {
    use super::indent;

    #[test]
    fn indent_is_two_spaces_per_level() {
        assert_eq!(indent(0), "");
        assert_eq!(indent(1), "  ");
        assert_eq!(indent(3), "      ");
    }
}
