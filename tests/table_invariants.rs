//! Property-based checks of the universal table invariants: row count
//! equals identifier count, sequence number is monotonic, and an
//! insert-then-delete sequence always restores the prior state.

use std::sync::Arc;

use proptest::prelude::*;
use tabula::layout::{DataType, FieldFlags, FieldProperties, Row, RowLayout, Value};
use tabula::table::MemoryTable;

fn colored_layout() -> Arc<RowLayout> {
    Arc::new(
        RowLayout::untyped(
            "widgets",
            vec![
                FieldProperties::new("id", DataType::Int64).with_flags(FieldFlags::ID),
                FieldProperties::new("color", DataType::String).with_flags(FieldFlags::INDEX),
            ],
        )
        .unwrap(),
    )
}

fn row(layout: &Arc<RowLayout>, color: &str) -> Row {
    Row::new(
        layout.clone(),
        vec![Some(Value::Int64(0)), Some(Value::String(color.to_string()))],
    )
    .unwrap()
}

proptest! {
    #[test]
    fn row_count_matches_id_count_after_arbitrary_inserts(colors in proptest::collection::vec("[a-c]", 0..30)) {
        let layout = colored_layout();
        let mut table = MemoryTable::new(layout.clone());
        let mut sequence = 0u64;
        for color in &colors {
            table.insert(row(&layout, color)).unwrap();
            sequence += 1;
            prop_assert_eq!(table.sequence_number(), sequence);
        }
        prop_assert_eq!(table.count(), table.ids().len());
        prop_assert_eq!(table.count(), colors.len());
    }

    #[test]
    fn insert_then_delete_restores_empty_state(colors in proptest::collection::vec("[a-c]", 1..15)) {
        let layout = colored_layout();
        let mut table = MemoryTable::new(layout.clone());
        let mut ids = Vec::new();
        for color in &colors {
            ids.push(table.insert(row(&layout, color)).unwrap());
        }
        for id in &ids {
            table.delete(*id).unwrap();
        }
        prop_assert_eq!(table.count(), 0);
        for id in &ids {
            prop_assert!(!table.exist(*id));
        }
    }
}
