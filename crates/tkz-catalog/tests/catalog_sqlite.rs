//! End-to-end coverage of the installed SQLite catalog: deployment,
//! joined CRUD semantics, impedance lookups and the chain currents.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use tkz_catalog::{
    db_install, default_data_dir, schema, BreakerSource, CableRowUpdate, CableSource, Catalog,
    ContactRowUpdate, Engine, InsertBreaker, InsertCable, InsertContact, InsertTransformer,
    JoinedOps, SqlValue, TableOps, TransformerRowUpdate, TransformerSource,
};
use tkz_core::{decimal_sqrt, parse_system, round_result, CalcSettings, ElemChain, Element, TkzError};

fn installed_engine() -> (tempfile::TempDir, Engine) {
    let dir = tempfile::tempdir().unwrap();
    let engine = Engine::sqlite(dir.path().join("catalog.db"), false);
    db_install(&engine, &default_data_dir(), false).unwrap();
    (dir, engine)
}

fn settings() -> CalcSettings {
    CalcSettings::new(dec!(0.4), 3)
}

fn count(engine: &Engine, table: &str) -> i64 {
    engine
        .session_scope(true, |session| {
            session.query_scalar(&format!("SELECT COUNT(*) FROM {table}"), &[])
        })
        .unwrap()
        .unwrap()
        .as_int()
        .unwrap()
}

#[test]
fn install_is_idempotent() {
    let (_dir, engine) = installed_engine();
    let transformers = count(&engine, "transformer");
    let cables = count(&engine, "cable");
    assert!(transformers > 0 && cables > 0);

    db_install(&engine, &default_data_dir(), false).unwrap();
    assert_eq!(count(&engine, "transformer"), transformers);
    assert_eq!(count(&engine, "cable"), cables);
}

#[test]
fn clear_install_rebuilds_tables() {
    let (_dir, engine) = installed_engine();
    let breakers = count(&engine, "current_breaker");
    // A stray row disappears with a clear install.
    TableOps::new(&schema::OTHER_CONTACT, &engine)
        .insert_table(
            Some(vec![vec![
                ("contact_type".to_string(), SqlValue::from("Временный")),
                ("resistance_r1".to_string(), SqlValue::Decimal(dec!(0.5))),
            ]]),
            None,
        )
        .unwrap();
    db_install(&engine, &default_data_dir(), true).unwrap();
    assert_eq!(count(&engine, "current_breaker"), breakers);
    let stray = engine
        .session_scope(true, |session| {
            session.query_scalar(
                "SELECT COUNT(*) FROM other_contact WHERE contact_type = ?",
                &[SqlValue::from("Временный")],
            )
        })
        .unwrap();
    assert_eq!(stray, Some(SqlValue::Int(0)));
}

#[test]
fn transformer_lookup_matches_catalog_row() {
    let (_dir, engine) = installed_engine();
    let catalog = Catalog::new(&engine);
    let transformer = Element::t(25, "У/Ун-0", dec!(0.4));
    let first = transformer.resistance_r1(&catalog).unwrap();
    assert_eq!(first, dec!(0.1539));
    // Re-evaluating against an unmodified catalog returns the same scalar.
    assert_eq!(transformer.resistance_r1(&catalog).unwrap(), first);
    assert_eq!(transformer.reactance_x0(&catalog).unwrap(), dec!(2.524));
}

#[test]
fn contact_lookups_use_the_flat_table() {
    let (_dir, engine) = installed_engine();
    let catalog = Catalog::new(&engine);
    assert_eq!(Element::line().resistance_r1(&catalog).unwrap(), dec!(0.015));
    assert_eq!(Element::arc().resistance_r1(&catalog).unwrap(), dec!(0.03));
    assert_eq!(
        Element::r("Клеммник").resistance_r1(&catalog).unwrap(),
        dec!(0.001)
    );
}

#[test]
fn cable_impedance_scales_with_length() {
    let (_dir, engine) = installed_engine();
    let catalog = Catalog::new(&engine);
    let short = Element::w("ВВГ", 3, dec!(4), 20);
    let long = Element::w("ВВГ", 3, dec!(4), 1000);
    let short_r1 = short.resistance_r1(&catalog).unwrap();
    let long_r1 = long.resistance_r1(&catalog).unwrap();
    assert_eq!(short_r1, long_r1 * dec!(20) / dec!(1000));
    assert_eq!(short_r1, dec!(0.0922));
}

#[test]
fn missing_element_error_carries_its_textual_form() {
    let (_dir, engine) = installed_engine();
    let catalog = Catalog::new(&engine);
    let unknown = Element::t(999, "У/Ун-0", dec!(0.4));
    match unknown.resistance_r1(&catalog).unwrap_err() {
        TkzError::NotInCatalog(message) => assert!(message.contains("T 999/0.4 (У/Ун-0)")),
        other => panic!("unexpected error {other:?}"),
    }
}

#[test]
fn single_chain_three_phase_current() {
    let (_dir, engine) = installed_engine();
    let catalog = Catalog::new(&engine);
    let chain = ElemChain::from_elements(vec![
        Element::t(160, "У/Ун-0", dec!(0.4)),
        Element::qs(160),
        Element::qf(160),
        Element::line(),
        Element::qf(25),
        Element::w("ВВГ", 3, dec!(4), 20),
        Element::line(),
        Element::arc(),
    ]);
    let three_phase = chain.three_phase_current(&catalog, &settings()).unwrap();
    assert!(three_phase > Decimal::ZERO);
    assert_eq!(three_phase.scale(), 3);

    let two_phase = chain.two_phase_current(&catalog, &settings()).unwrap();
    let expected = round_result(decimal_sqrt(dec!(3)).unwrap() / dec!(2) * three_phase, 3);
    assert_eq!(two_phase, expected);

    let one_phase = chain.one_phase_current(&catalog, &settings()).unwrap();
    assert!(one_phase > Decimal::ZERO);
    // The loop impedance exceeds the positive-sequence one.
    assert!(one_phase < three_phase * dec!(3));
}

#[test]
fn parsed_system_evaluates_end_to_end() {
    let (_dir, engine) = installed_engine();
    let catalog = Catalog::new(&engine);
    let system = parse_system(
        "T(160, 'У/Ун-0'), QS(160), QF(160), Line(), QF(25), W('ВВГ', 3, 4, 20), Line(), Arc(); \
         TCH: T(160, 'У/Ун-0'), QF3: QF(100), R1: Line(), QF2: QF(25), W1: W('ВВГ', 3, 4, 20)",
        dec!(0.4),
    )
    .unwrap();
    assert_eq!(system.len(), 2);
    assert_eq!(system[0].len(), 8);
    assert_eq!(system[1].len(), 5);
    let labels: Vec<&str> = (0..5).map(|index| system[1].label(index).unwrap()).collect();
    assert_eq!(labels, ["TCH", "QF3", "R1", "QF2", "W1"]);

    for chain in &system {
        assert!(chain.three_phase_current(&catalog, &settings()).unwrap() > Decimal::ZERO);
    }
}

#[test]
fn joined_insert_deduplicates_dimensions() {
    let (_dir, engine) = installed_engine();
    let ops = JoinedOps::new(&schema::CURRENT_BREAKER, &engine);

    let mut first = InsertBreaker::new("Пускатель", 2000);
    first.resistance_r1 = dec!(0.5);
    let mut second = InsertBreaker::new("Пускатель", 2000);
    second.resistance_r1 = dec!(0.9);
    let inserted = ops
        .insert_joined_table(&[first.into_row(), second.into_row()])
        .unwrap();
    assert_eq!(inserted, 1);

    let row = engine
        .session_scope(true, |session| {
            session.query(
                "SELECT current_breaker.resistance_r1 FROM current_breaker \
                 JOIN device ON current_breaker.device_type_id = device.id \
                 JOIN current_nominal ON current_breaker.current_value_id = current_nominal.id \
                 WHERE device.device_type = ? AND current_nominal.current_value = ?",
                &[SqlValue::from("Пускатель"), SqlValue::Int(2000)],
            )
        })
        .unwrap();
    // The first payload won; the duplicate dimension tuple was reported
    // non-fresh.
    assert_eq!(row, vec![vec![SqlValue::Decimal(dec!(0.5))]]);
}

#[test]
fn insert_with_fully_existing_dimensions_is_a_no_op() {
    let (_dir, engine) = installed_engine();
    let ops = JoinedOps::new(&schema::CURRENT_BREAKER, &engine);
    let devices = count(&engine, "device");
    let breakers = count(&engine, "current_breaker");

    let mut duplicate = InsertBreaker::new("Автомат", 25);
    duplicate.resistance_r1 = dec!(9.9);
    assert_eq!(ops.insert_joined_table(&[duplicate.into_row()]).unwrap(), 0);

    assert_eq!(count(&engine, "device"), devices);
    assert_eq!(count(&engine, "current_breaker"), breakers);
    let catalog = Catalog::new(&engine);
    // The stored parameters did not move.
    assert_eq!(
        Element::qf(25).resistance_r1(&catalog).unwrap(),
        dec!(0.0024)
    );
}

#[test]
fn delete_from_source_cascades_to_fact_rows() {
    let (_dir, engine) = installed_engine();
    let ops = JoinedOps::new(&schema::CABLE, &engine);
    let referencing = engine
        .session_scope(true, |session| {
            session.query_scalar(
                "SELECT COUNT(*) FROM cable JOIN mark ON cable.mark_name_id = mark.id \
                 WHERE mark.mark_name = ?",
                &[SqlValue::from("СИП")],
            )
        })
        .unwrap()
        .unwrap()
        .as_int()
        .unwrap();
    assert!(referencing > 0);
    let total = count(&engine, "cable");

    let source = CableSource {
        mark_name: Some("СИП".into()),
        ..CableSource::default()
    };
    ops.delete_joined_table(&source.into_row(), true).unwrap();

    assert_eq!(count(&engine, "cable"), total - referencing);
    let orphans = engine
        .session_scope(true, |session| {
            session.query_scalar(
                "SELECT COUNT(*) FROM cable WHERE mark_name_id NOT IN (SELECT id FROM mark)",
                &[],
            )
        })
        .unwrap();
    assert_eq!(orphans, Some(SqlValue::Int(0)));
}

#[test]
fn delete_single_fact_row_keeps_dimensions() {
    let (_dir, engine) = installed_engine();
    let ops = JoinedOps::new(&schema::TRANSFORMER, &engine);
    let total = count(&engine, "transformer");
    let source = TransformerSource {
        power: Some(63),
        voltage: Some(dec!(0.4)),
        vector_group: Some("Д/Ун-11".into()),
    };
    let deleted = ops.delete_joined_table(&source.into_row(), false).unwrap();
    assert_eq!(deleted, 1);
    assert_eq!(count(&engine, "transformer"), total - 1);
    // The dimension rows survive a fact-row delete.
    assert_eq!(count(&engine, "power_nominal"), 9);
}

#[test]
fn read_joined_table_is_ordered_and_numbered() {
    let (_dir, engine) = installed_engine();
    let frame = JoinedOps::new(&schema::TRANSFORMER, &engine)
        .read_joined_table()
        .unwrap();
    assert_eq!(
        frame.headers[..4],
        ["#", "power", "voltage", "vector_group"]
    );
    assert_eq!(frame.len() as i64, count(&engine, "transformer"));

    let numbers: Vec<i64> = frame
        .rows
        .iter()
        .map(|row| row[0].as_int().unwrap())
        .collect();
    assert_eq!(numbers, (1..=frame.len() as i64).collect::<Vec<_>>());

    let powers: Vec<Decimal> = frame
        .rows
        .iter()
        .map(|row| row[1].as_decimal().unwrap())
        .collect();
    let mut sorted = powers.clone();
    sorted.sort();
    assert_eq!(powers, sorted);
}

#[test]
fn update_joined_table_edits_fact_and_dimension() {
    let (_dir, engine) = installed_engine();
    let ops = JoinedOps::new(&schema::CABLE, &engine);
    let old_source = CableSource {
        mark_name: Some("ВВГ".into()),
        multicore_amount: Some(3),
        cable_range: Some(dec!(4)),
    };

    // Only the provided fact column moves.
    let target = CableRowUpdate {
        continuous_current: Some(dec!(100)),
        ..CableRowUpdate::default()
    };
    ops.update_joined_table(&old_source.clone().into_row(), &[], &target.into_row())
        .unwrap();
    let (current, r1) = engine
        .session_scope(true, |session| {
            let rows = session.query(
                "SELECT cable.continuous_current, cable.resistance_r1 FROM cable \
                 JOIN mark ON cable.mark_name_id = mark.id \
                 JOIN amount ON cable.multicore_amount_id = amount.id \
                 JOIN range_val ON cable.cable_range_id = range_val.id \
                 WHERE mark.mark_name = ? AND amount.multicore_amount = ? \
                 AND range_val.cable_range = ?",
                &[
                    SqlValue::from("ВВГ"),
                    SqlValue::Int(3),
                    SqlValue::Decimal(dec!(4)),
                ],
            )?;
            Ok((rows[0][0].clone(), rows[0][1].clone()))
        })
        .unwrap();
    assert_eq!(current, SqlValue::Int(100));
    assert_eq!(r1, SqlValue::Decimal(dec!(4.61)));

    // Renaming the dimension cascades into every referencing fact row.
    let new_source = CableSource {
        mark_name: Some("ВВГнг".into()),
        ..CableSource::default()
    };
    ops.update_joined_table(
        &CableSource {
            mark_name: Some("ВВГ".into()),
            ..CableSource::default()
        }
        .into_row(),
        &new_source.into_row(),
        &[],
    )
    .unwrap();
    let catalog = Catalog::new(&engine);
    assert!(Element::w("ВВГ", 3, dec!(4), 20)
        .resistance_r1(&catalog)
        .is_err());
    assert_eq!(
        Element::w("ВВГнг", 3, dec!(4), 20)
            .resistance_r1(&catalog)
            .unwrap(),
        dec!(0.0922)
    );
}

#[test]
fn update_with_nothing_to_do_is_bad_input() {
    let (_dir, engine) = installed_engine();
    let ops = JoinedOps::new(&schema::CURRENT_BREAKER, &engine);
    let source = BreakerSource {
        device_type: Some("Автомат".into()),
        current_value: Some(25),
    };
    let err = ops
        .update_joined_table(&source.into_row(), &[], &[])
        .unwrap_err();
    assert!(matches!(err, TkzError::BadInput(_)));
}

#[test]
fn reset_id_preserves_the_row_multiset() {
    let (_dir, engine) = installed_engine();
    let ops = JoinedOps::new(&schema::TRANSFORMER, &engine);
    TableOps::new(&schema::TRANSFORMER, &engine)
        .delete_table("id = 3")
        .unwrap();
    let before = ops.read_joined_table().unwrap();

    ops.reset_id().unwrap();

    let after = ops.read_joined_table().unwrap();
    assert_eq!(before, after);
    let ids: Vec<i64> = engine
        .session_scope(true, |session| {
            session.query("SELECT id FROM transformer ORDER BY id", &[])
        })
        .unwrap()
        .into_iter()
        .map(|row| row[0].as_int().unwrap())
        .collect();
    assert_eq!(ids, (1..=after.len() as i64).collect::<Vec<_>>());
}

#[test]
fn drop_table_requires_the_table_name_as_confirmation() {
    let (_dir, engine) = installed_engine();
    let ops = TableOps::new(&schema::OTHER_CONTACT, &engine);
    assert!(!ops.drop_table("wrong_name", false).unwrap());
    assert_eq!(count(&engine, "other_contact"), 4);
}

#[test]
fn insert_without_any_source_is_bad_input() {
    let (_dir, engine) = installed_engine();
    let ops = TableOps::new(&schema::OTHER_CONTACT, &engine);
    assert!(matches!(
        ops.insert_table(None, None),
        Err(TkzError::BadInput(_))
    ));
}

#[test]
fn read_table_filters_and_limits() {
    let (_dir, engine) = installed_engine();
    let ops = TableOps::new(&schema::POWER_NOMINAL, &engine);
    let frame = ops.read_table(Some("power <= 63"), None).unwrap();
    assert_eq!(frame.len(), 3);
    let limited = ops.read_table(None, Some(2)).unwrap();
    assert_eq!(limited.len(), 2);
}

#[test]
fn forced_drop_bypasses_foreign_keys() {
    let (_dir, engine) = installed_engine();
    let ops = TableOps::new(&schema::MARK, &engine);
    assert!(ops.drop_table("mark", true).unwrap());
    let exists = engine
        .session_scope(true, |session| session.table_exists("mark"))
        .unwrap();
    assert!(!exists);
}

#[test]
fn base_reset_id_is_a_no_op_on_sqlite_parents() {
    let (_dir, engine) = installed_engine();
    let ops = TableOps::new(&schema::POWER_NOMINAL, &engine);
    ops.delete_table("id = 1").unwrap();
    ops.reset_id().unwrap();
    let ids: Vec<i64> = engine
        .session_scope(true, |session| {
            session.query("SELECT id FROM power_nominal ORDER BY id", &[])
        })
        .unwrap()
        .into_iter()
        .map(|row| row[0].as_int().unwrap())
        .collect();
    // Rowids keep their gap; sqlite continues past the highest one.
    assert_eq!(ids.first(), Some(&2));
}

#[test]
fn update_table_with_alias_binds_rows_in_bulk() {
    let (_dir, engine) = installed_engine();
    let ops = TableOps::new(&schema::OTHER_CONTACT, &engine);
    let rows = vec![
        vec![
            ("kind".to_string(), SqlValue::from("РУ")),
            ("reactance_x1".to_string(), SqlValue::Decimal(dec!(0.002))),
        ],
        vec![
            ("kind".to_string(), SqlValue::from("Дуга")),
            ("reactance_x1".to_string(), SqlValue::Decimal(dec!(0.003))),
        ],
    ];
    let affected = ops
        .update_table(
            &rows,
            tkz_catalog::UpdateMode::WithAlias {
                attr: "contact_type",
                alias: "kind",
            },
        )
        .unwrap();
    assert_eq!(affected, 2);
    let catalog = Catalog::new(&engine);
    assert_eq!(
        Element::line().reactance_x1(&catalog).unwrap(),
        dec!(0.002)
    );
}

#[test]
fn update_table_where_condition_edits_contacts() {
    let (_dir, engine) = installed_engine();
    let ops = TableOps::new(&schema::OTHER_CONTACT, &engine);
    let update = ContactRowUpdate {
        resistance_r1: Some(dec!(0.02)),
        ..ContactRowUpdate::default()
    };
    let affected = ops
        .update_table(
            &[update.into_row()],
            tkz_catalog::UpdateMode::WhereCondition {
                attr: "contact_type",
                criteria: &[SqlValue::from("РУ")],
            },
        )
        .unwrap();
    assert_eq!(affected, 1);
    let catalog = Catalog::new(&engine);
    assert_eq!(Element::line().resistance_r1(&catalog).unwrap(), dec!(0.02));
    assert_eq!(Element::arc().resistance_r1(&catalog).unwrap(), dec!(0.03));
}

#[test]
fn update_table_by_primary_key() {
    let (_dir, engine) = installed_engine();
    let ops = TableOps::new(&schema::POWER_NOMINAL, &engine);
    let row = vec![
        ("id".to_string(), SqlValue::Int(1)),
        ("power".to_string(), SqlValue::Int(26)),
    ];
    assert_eq!(
        ops.update_table(&[row], tkz_catalog::UpdateMode::PrimaryKeys)
            .unwrap(),
        1
    );
    let value = engine
        .session_scope(true, |session| {
            session.query_scalar("SELECT power FROM power_nominal WHERE id = 1", &[])
        })
        .unwrap();
    assert_eq!(value, Some(SqlValue::Int(26)));
}

#[test]
fn insert_models_round_trip_through_the_joins() {
    let (_dir, engine) = installed_engine();
    let transformers = JoinedOps::new(&schema::TRANSFORMER, &engine);
    let mut payload = InsertTransformer::new(1600, dec!(0.4), "Д/Ун-11");
    payload.resistance_r1 = dec!(0.001);
    payload.reactance_x1 = dec!(0.0054);
    payload.resistance_r0 = dec!(0.001);
    payload.reactance_x0 = dec!(0.0054);
    assert_eq!(
        transformers
            .insert_joined_table(&[payload.into_row()])
            .unwrap(),
        1
    );
    let catalog = Catalog::new(&engine);
    let element = Element::t(1600, "Д/Ун-11", dec!(0.4));
    assert_eq!(element.resistance_r1(&catalog).unwrap(), dec!(0.001));

    // The non-null fact edit touches only the provided column.
    let target = TransformerRowUpdate {
        reactance_x1: Some(dec!(0.006)),
        ..TransformerRowUpdate::default()
    };
    let source = TransformerSource {
        power: Some(1600),
        voltage: Some(dec!(0.4)),
        vector_group: Some("Д/Ун-11".into()),
    };
    transformers
        .update_joined_table(&source.into_row(), &[], &target.into_row())
        .unwrap();
    assert_eq!(element.reactance_x1(&catalog).unwrap(), dec!(0.006));
    assert_eq!(element.resistance_r1(&catalog).unwrap(), dec!(0.001));
}

#[test]
fn new_cable_and_contact_payloads_become_lookupable() {
    let (_dir, engine) = installed_engine();
    let cables = JoinedOps::new(&schema::CABLE, &engine);
    let mut payload = InsertCable::new("КГ", 4, dec!(4));
    payload.continuous_current = dec!(35);
    payload.resistance_r1 = dec!(4.65);
    payload.reactance_x1 = dec!(0.095);
    payload.resistance_r0 = dec!(11.6);
    payload.reactance_x0 = dec!(0.285);
    assert_eq!(cables.insert_joined_table(&[payload.into_row()]).unwrap(), 1);

    let mut contact = InsertContact::new("Болт");
    contact.resistance_r1 = dec!(0.0005);
    TableOps::new(&schema::OTHER_CONTACT, &engine)
        .insert_table(Some(vec![contact.into_row()]), None)
        .unwrap();

    let catalog = Catalog::new(&engine);
    assert_eq!(
        Element::w("КГ", 4, dec!(4), 100).resistance_r1(&catalog).unwrap(),
        dec!(0.465)
    );
    assert_eq!(
        Element::r("Болт").resistance_r1(&catalog).unwrap(),
        dec!(0.0005)
    );
}
