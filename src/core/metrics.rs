use crate::core::{ComplexitySummary, FunctionRecord};

pub fn calculate_average_complexity(functions: &[&FunctionRecord]) -> f64 {
    if functions.is_empty() {
        return 0.0;
    }

    let total: u32 = functions.iter().map(|f| f.cyclomatic_complexity).sum();
    total as f64 / functions.len() as f64
}

pub fn find_max_complexity(functions: &[&FunctionRecord]) -> u32 {
    functions
        .iter()
        .map(|f| f.cyclomatic_complexity)
        .max()
        .unwrap_or(0)
}

pub fn count_high_complexity(functions: &[&FunctionRecord], threshold: u32) -> usize {
    functions.iter().filter(|f| f.is_complex(threshold)).count()
}

pub fn summarize_complexity(functions: &[&FunctionRecord], threshold: u32) -> ComplexitySummary {
    ComplexitySummary {
        total_functions: functions.len(),
        average_complexity: calculate_average_complexity(functions),
        max_complexity: find_max_complexity(functions),
        high_complexity_count: count_high_complexity(functions, threshold),
    }
}

/// Most complex first; ties keep their input order.
pub fn sort_by_complexity<'a>(
    mut functions: Vec<(&'a str, &'a FunctionRecord)>,
) -> Vec<(&'a str, &'a FunctionRecord)> {
    functions.sort_by(|a, b| b.1.cyclomatic_complexity.cmp(&a.1.cyclomatic_complexity));
    functions
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{FunctionRecord, ReturnType};
    use std::collections::{BTreeMap, BTreeSet};

    fn record(name: &str, complexity: u32) -> FunctionRecord {
        FunctionRecord {
            name: name.to_string(),
            class_name: None,
            parameters: vec![],
            line_start: 1,
            line_end: 2,
            cyclomatic_complexity: complexity,
            anonymous_functions: 0,
            calls_database: false,
            uses_ambient_state: BTreeSet::new(),
            uses_request_input: BTreeSet::new(),
            calls_functions: vec![],
            return_type: ReturnType::Void,
            return_keys: BTreeSet::new(),
            return_nested_keys: BTreeMap::new(),
            visibility: None,
            is_static: false,
            is_abstract: false,
            doc_param_types: BTreeMap::new(),
            doc_return_type: None,
            malformed: false,
        }
    }

    #[test]
    fn test_summary_of_empty_set() {
        let summary = summarize_complexity(&[], 10);
        assert_eq!(summary.total_functions, 0);
        assert_eq!(summary.average_complexity, 0.0);
        assert_eq!(summary.max_complexity, 0);
    }

    #[test]
    fn test_summary_counts_high_complexity() {
        let a = record("a", 2);
        let b = record("b", 12);
        let c = record("c", 4);
        let summary = summarize_complexity(&[&a, &b, &c], 10);
        assert_eq!(summary.total_functions, 3);
        assert_eq!(summary.max_complexity, 12);
        assert_eq!(summary.high_complexity_count, 1);
        assert!((summary.average_complexity - 6.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_sort_by_complexity_descending() {
        let a = record("a", 2);
        let b = record("b", 9);
        let sorted = sort_by_complexity(vec![("x.php", &a), ("y.php", &b)]);
        assert_eq!(sorted[0].1.name, "b");
    }
}
