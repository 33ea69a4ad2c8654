use indexmap::IndexMap;
use indoc::indoc;
use serde::{Deserialize, Serialize};
use serde_saphyr_schema::{
    ClassSpec, Dumper, HookError, Loader, Node, NodeType, Probe, ScalarKind, ScalarValue, Type,
};

#[derive(Serialize, Deserialize, Debug, PartialEq)]
struct Postcode {
    digits: i64,
    letters: String,
}

#[derive(Serialize, Deserialize, Debug, PartialEq)]
struct Address {
    street: String,
    postcode: Postcode,
}

fn postcode_recognize(probe: &Probe<'_>) -> Result<(), HookError> {
    probe
        .require_scalar(&[ScalarKind::Str])
        .or_else(|_| probe.require_mapping())
}

fn postcode_desugar(node: &mut Node) -> Result<(), HookError> {
    let Some(text) = node.as_str().map(str::to_owned) else {
        return Ok(());
    };
    let (digits, letters) = text
        .split_once(' ')
        .ok_or_else(|| HookError::new(format!("\"{text}\" is not a postcode like \"1098 XG\"")))?;
    let digits: i64 = digits
        .parse()
        .map_err(|_| HookError::new(format!("\"{digits}\" should be four digits")))?;
    node.make_mapping();
    node.set_attribute("digits", digits)?;
    node.set_attribute("letters", letters)?;
    Ok(())
}

fn postcode_resugar(node: &mut Node) -> Result<(), HookError> {
    let digits = node.get_attribute("digits")?.get_value();
    let letters = node.get_attribute("letters")?.get_value();
    if let (Some(ScalarValue::Int(digits)), Some(ScalarValue::Str(letters))) = (digits, letters) {
        node.set_value(format!("{digits} {letters}"));
    }
    Ok(())
}

fn postcode_classes() -> [ClassSpec; 2] {
    [
        ClassSpec::object("Postcode")
            .required::<i64>("digits")
            .required::<String>("letters")
            .recognize(postcode_recognize)
            .desugar(postcode_desugar)
            .resugar(postcode_resugar),
        ClassSpec::object("Address")
            .required::<String>("street")
            .required_type("postcode", Type::class("Postcode")),
    ]
}

#[test]
fn postcodes_are_written_as_one_string() -> anyhow::Result<()> {
    let loader = postcode_classes()
        .into_iter()
        .fold(Loader::new(Type::class("Address")), Loader::register);
    let address: Address = loader.load("street: Science Park\npostcode: 1098 XG\n")?;
    assert_eq!(
        address.postcode,
        Postcode {
            digits: 1098,
            letters: "XG".into()
        }
    );

    let long_form: Address =
        loader.load("street: Science Park\npostcode: {digits: 1098, letters: XG}\n")?;
    assert_eq!(long_form, address);

    let dumper = postcode_classes().into_iter().fold(Dumper::new(), Dumper::register);
    assert_eq!(
        dumper.dump(&address)?,
        "street: Science Park\npostcode: 1098 XG\n"
    );
    Ok(())
}

#[test]
fn desugar_errors_point_at_the_node() {
    let loader = postcode_classes()
        .into_iter()
        .fold(Loader::new(Type::class("Address")), Loader::register);
    let err = loader
        .load::<Address>("street: x\npostcode: XG1098\n")
        .unwrap_err();
    assert!(err.to_string().contains("is not a postcode"), "{err}");
    let location = err.location().expect("hook errors carry a location");
    assert_eq!((location.line(), location.column()), (2, 11));
}

#[derive(Deserialize, Debug, PartialEq)]
struct Derived {
    value: Option<i64>,
    doubled: Option<i64>,
}

fn base_desugar(node: &mut Node) -> Result<(), HookError> {
    node.rename_attribute("val", "value");
    Ok(())
}

fn derived_desugar(node: &mut Node) -> Result<(), HookError> {
    let value = match node.get_attribute("value")?.get_value() {
        Some(ScalarValue::Int(i)) => i,
        _ => return Err(HookError::new("value must be an int")),
    };
    node.set_attribute("doubled", value * 2)
}

#[test]
fn base_hooks_run_first() -> anyhow::Result<()> {
    let loader = Loader::new(Type::class("Derived"))
        .register(
            ClassSpec::object("Base")
                .optional::<Option<i64>>("value")
                .desugar(base_desugar),
        )
        .register(
            ClassSpec::object("Derived")
                .base("Base")
                .optional::<Option<i64>>("doubled")
                .desugar(derived_desugar),
        );
    let derived: Derived = loader.load("val: 21\n")?;
    assert_eq!(
        derived,
        Derived {
            value: Some(21),
            doubled: Some(42)
        }
    );
    Ok(())
}

#[derive(Serialize, Deserialize, Debug, PartialEq)]
struct Limits {
    max_size: i64,
    min_free_space: i64,
}

fn dashes(node: &mut Node) -> Result<(), HookError> {
    node.unders_to_dashes_in_keys();
    Ok(())
}

#[test]
fn dashed_keys_on_both_sides() -> anyhow::Result<()> {
    let spec = || {
        ClassSpec::object("Limits")
            .required::<i64>("max_size")
            .required::<i64>("min_free_space")
            .resugar(dashes)
    };
    let loader = Loader::new(Type::class("Limits")).register(spec());
    let limits: Limits = loader.load("max-size: 10\nmin_free_space: 2\n")?;
    assert_eq!(
        limits,
        Limits {
            max_size: 10,
            min_free_space: 2
        }
    );
    let yaml = Dumper::new().register(spec()).dump(&limits)?;
    assert_eq!(yaml, "max-size: 10\nmin-free-space: 2\n");

    let typo = loader
        .load::<Limits>("max-size: 10\nmin-free-spce: 2\n")
        .unwrap_err()
        .to_string();
    assert!(
        typo.contains("Expected a key \"min_free_space\" or maybe \"min-free-space\""),
        "{typo}"
    );
    assert!(typo.contains("Maybe \"min-free-spce\" was intended"), "{typo}");
    Ok(())
}

#[derive(Serialize, Deserialize, Debug, PartialEq)]
struct Extensible {
    a: i64,
    #[serde(default)]
    extra: IndexMap<String, serde_json::Value>,
}

fn extensible_spec() -> ClassSpec {
    ClassSpec::object("Extensible").required::<i64>("a").extra("extra")
}

#[test]
fn unknown_keys_go_to_the_overflow_slot() -> anyhow::Result<()> {
    let loader = Loader::new(Type::class("Extensible")).register(extensible_spec());
    let ext: Extensible = loader.load("b: x\na: 10\nc: 42\n")?;
    assert_eq!(ext.a, 10);
    assert_eq!(ext.extra.keys().collect::<Vec<_>>(), ["b", "c"]);
    assert_eq!(ext.extra["b"], serde_json::json!("x"));
    assert_eq!(ext.extra["c"], serde_json::json!(42));

    let yaml = Dumper::new().register(extensible_spec()).dump(&ext)?;
    assert_eq!(yaml, "a: 10\nb: x\nc: 42\n");

    let err = loader.load::<Extensible>("b: x\n").unwrap_err();
    assert!(err.to_string().contains("\"a\""), "{err}");
    Ok(())
}

#[test]
fn repeated_extra_keys_are_rejected() {
    let loader = Loader::new(Type::class("Extensible")).register(extensible_spec());
    let err = loader
        .load::<Extensible>("a: 1\nb: 1\nb: 2\n")
        .unwrap_err();
    assert!(err.to_string().contains("Found the key \"b\" more than once"), "{err}");
    let location = err.location().expect("the second key has a position");
    assert_eq!((location.line(), location.column()), (3, 1));
}

#[test]
fn canonical_node_holds_the_slot() -> anyhow::Result<()> {
    let loader = Loader::new(Type::class("Extensible")).register(extensible_spec());
    let node = loader.load_node("a: 1\nz: [1, 2]\n")?;
    assert_eq!(node.keys(), ["a", "extra"]);
    assert!(node.has_attribute_type("extra", NodeType::Mapping));
    assert_eq!(node.get("extra").map(Node::keys), Some(vec!["z"]));
    Ok(())
}

#[derive(Serialize, Deserialize, Debug, PartialEq)]
struct Item {
    id: String,
    price: i64,
}

#[derive(Serialize, Deserialize, Debug, PartialEq)]
struct Catalog {
    items: Vec<Item>,
    currency: String,
}

fn is_mapping(probe: &Probe<'_>) -> Result<(), HookError> {
    probe.require_mapping()
}

fn catalog_desugar(node: &mut Node) -> Result<(), HookError> {
    node.map_attribute_to_seq("items", "id", Some("price"));
    if !node.has_attribute("currency") {
        node.set_attribute("currency", "EUR")?;
    }
    Ok(())
}

fn catalog_resugar(node: &mut Node) -> Result<(), HookError> {
    node.seq_attribute_to_map("items", "id", Some("price"), true)?;
    node.remove_attributes_with_default_values(&[("currency", "EUR".into())]);
    Ok(())
}

fn catalog_classes() -> [ClassSpec; 2] {
    [
        ClassSpec::object("Item")
            .required::<String>("id")
            .required::<i64>("price"),
        ClassSpec::object("Catalog")
            .required_type("items", Type::seq(Type::class("Item")))
            .required::<String>("currency")
            .recognize(is_mapping)
            .desugar(catalog_desugar)
            .resugar(catalog_resugar),
    ]
}

#[test]
fn collections_written_as_mappings() -> anyhow::Result<()> {
    let loader = catalog_classes()
        .into_iter()
        .fold(Loader::new(Type::class("Catalog")), Loader::register);
    let catalog: Catalog = loader.load(indoc! {"
        items:
          apple: 3
          pear:
            price: 5
    "})?;
    assert_eq!(catalog.currency, "EUR");
    assert_eq!(
        catalog.items,
        vec![
            Item {
                id: "apple".into(),
                price: 3
            },
            Item {
                id: "pear".into(),
                price: 5
            },
        ]
    );

    let dumper = catalog_classes().into_iter().fold(Dumper::new(), Dumper::register);
    let yaml = dumper.dump(&catalog)?;
    assert_eq!(yaml, "items:\n  apple: 3\n  pear: 5\n");
    Ok(())
}

#[test]
fn resugar_must_leave_scalar_keys() {
    fn complex_key(node: &mut Node) -> Result<(), HookError> {
        let value = node.remove_attribute("a").unwrap_or_else(Node::null);
        if let Some(entries) = node.entries_mut() {
            entries.push((Node::sequence(vec![Node::int(1)]), value));
        }
        Ok(())
    }
    let dumper = Dumper::new().register(
        ClassSpec::object("Extensible")
            .required::<i64>("a")
            .extra("extra")
            .resugar(complex_key),
    );
    let value = Extensible {
        a: 1,
        extra: IndexMap::new(),
    };
    let err = dumper.dump(&value).unwrap_err();
    assert!(err.to_string().contains("keys must be scalars"), "{err}");
}
