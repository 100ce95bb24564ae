use std::sync::atomic::{AtomicBool, Ordering};

use mustachio::{value, Engine, Value, ValueKind};

#[track_caller]
fn render(source: &str, model: Value) -> String {
    let engine = Engine::new();
    engine
        .compile(source)
        .unwrap()
        .render(model)
        .unwrap()
}

#[test]
fn render_content_only() {
    assert_eq!(render("lorem ipsum", value!({})), "lorem ipsum");
}

#[test]
fn render_substitution() {
    let model = value!({ name: "world" });
    assert_eq!(render("hello [[name]]!", model), "hello world!");
}

#[test]
fn render_nested_path() {
    let model = value!({ company: { ceo: { name: "Ada" } } });
    assert_eq!(render("[[company.ceo.name]]", model), "Ada");
}

#[test]
fn render_missing_value_is_empty() {
    assert_eq!(render("a[[missing]]b", value!({})), "ab");
    assert_eq!(render("a[[missing.deeper.path]]b", value!({})), "ab");
}

#[test]
fn render_null_text() {
    let mut engine = Engine::new();
    engine.set_null_text("N/A");
    let template = engine.compile("value: [[missing(d)]]").unwrap();
    assert_eq!(template.render(value!({})).unwrap(), "value: N/A");
    // plain substitutions of absent values print nothing
    let template = engine.compile("value: [[missing]]").unwrap();
    assert_eq!(template.render(value!({})).unwrap(), "value: ");
}

#[test]
fn render_scalar_forms() {
    let model = value!({ b: false, i: 0, f: 1.5, s: "x" });
    assert_eq!(render("[[b]],[[i]],[[f]],[[s]]", model), "false,0,1.5,x");
}

#[test]
fn render_comment_is_dropped() {
    assert_eq!(
        render("a[[!ignore me, please]]b", value!({})),
        "ab"
    );
    assert_eq!(render("a[[!spans\n  two lines]]b", value!({})), "ab");
}

#[test]
fn render_escapes_rtf_control_chars() {
    let model = value!({ text: "{wbr}" });
    assert_eq!(render("[[text]]", model), r"\'7bwbr\'7d");
}

#[test]
fn render_escapes_non_ascii_bytes() {
    let model = value!({ text: "déjà" });
    assert_eq!(render("[[text]]", model), r"d\'c3\'a9j\'c3\'a0");
}

#[test]
fn render_unescaped_forms() {
    let model = value!({ text: "{wbr}" });
    assert_eq!(render("[[[text]]]", model.clone()), "{wbr}");
    assert_eq!(render("[[&text]]", model), "{wbr}");
}

#[test]
fn render_escaping_disabled() {
    let mut engine = Engine::new();
    engine.set_disable_escaping(true);
    let result = engine
        .compile("[[text]]")
        .unwrap()
        .render(value!({ text: "{wbr}" }))
        .unwrap();
    assert_eq!(result, "{wbr}");
}

#[test]
fn render_partial_delimiters_stay_raw() {
    let model = value!({ name: "world" });
    assert_eq!(render("[[[[name]]", model.clone()), "[[world");
    assert_eq!(render("[[[name]]", model.clone()), "[world");
    assert_eq!(render("[[name", model.clone()), "[[name");
    assert_eq!(render("[[name]]]", model.clone()), "world]");
    assert_eq!(render("[[name]]]]", model.clone()), "world]]");
    assert_eq!(render("name]]", model), "name]]");
}

#[test]
fn render_section_truthy() {
    let model = value!({ person: { name: "Ada" } });
    assert_eq!(
        render("[[#person]]hello [[name]][[/person]]", model),
        "hello Ada"
    );
}

#[test]
fn render_section_falsy_values_suppress_body() {
    for model in [
        value!({}),
        value!({ cond: false }),
        value!({ cond: 0 }),
        value!({ cond: 0.0 }),
        value!({ cond: "" }),
        value!({ cond: [] }),
        value!({ cond: None }),
    ] {
        assert_eq!(render("[[#cond]]x[[/cond]]", model), "");
    }
}

#[test]
fn render_inverted_section() {
    assert_eq!(render("[[^cond]]empty[[/cond]]", value!({})), "empty");
    assert_eq!(
        render("[[^cond]]empty[[/cond]]", value!({ cond: true })),
        ""
    );
}

#[test]
fn render_inverted_section_sees_outer_scope() {
    let model = value!({ name: "outer", cond: false });
    assert_eq!(
        render("[[^cond]][[../name]][[/cond]]", model),
        "outer"
    );
}

#[test]
fn render_conditional_group_with_negation() {
    let source = "[[#items]]some[[^items]]none[[/items]]";
    assert_eq!(render(source, value!({ items: [1] })), "some");
    assert_eq!(render(source, value!({ items: [] })), "none");
}

#[test]
fn render_loop_over_strings() {
    let model = value!({ items: ["a", "b", "c"] });
    assert_eq!(
        render("[[#each items]]<[[.]]>[[/each]]", model),
        "<a><b><c>"
    );
}

#[test]
fn render_loop_over_maps() {
    let model = value!({
        people: [{ name: "Ada" }, { name: "Grace" }],
    });
    assert_eq!(
        render("[[#each people]][[name]] [[/each]]", model),
        "Ada Grace "
    );
}

#[test]
fn render_loop_falsy_is_skipped() {
    assert_eq!(render("[[#each items]]x[[/each]]", value!({})), "");
    assert_eq!(
        render("[[#each items]]x[[/each]]", value!({ items: [] })),
        ""
    );
}

#[test]
fn render_loop_variables() {
    let model = value!({ items: ["a", "b", "c"] });
    let source =
        "[[#each items]][[$index]],[[$first]],[[$middle]],[[$last]],[[$odd]],[[$even]].[[/each]]";
    assert_eq!(
        render(source, model),
        "0,true,false,false,false,true.\
         1,false,true,false,true,false.\
         2,false,false,true,false,true."
    );
}

#[test]
fn render_loop_variables_outside_loop_resolve_from_model() {
    // without loop metadata `$index` is an ordinary key
    let model = Value::from([("$index", "shadowed")]);
    assert_eq!(render("[[$index]]", model), "shadowed");
    assert_eq!(render("[[$index]]", value!({})), "");
}

#[test]
fn render_loop_parent_navigation() {
    // the first `../` reaches the collection itself, the second its scope
    let model = value!({
        prefix: "- ",
        items: ["x", "y"],
    });
    assert_eq!(
        render("[[#each items]][[../../prefix]][[.]][[/each]]", model),
        "- x- y"
    );
}

#[test]
fn render_loop_parent_navigation_complex_path() {
    let model = value!({
        Company: {
            ceo: {
                last_name: "Smith",
                products: [
                    { name: "cog", version: 1 },
                    { name: "sprocket", version: 2 },
                ],
            },
        },
    });
    assert_eq!(
        render(
            "[[#each Company.ceo.products]]<li>[[name]] [[version]] by [[../../last_name]]</li>[[/each]]",
            model
        ),
        "<li>cog 1 by Smith</li><li>sprocket 2 by Smith</li>"
    );
}

#[test]
fn render_nested_loops_with_parent_navigation() {
    let model = value!({
        groups: [
            { name: "g1", items: ["a", "b"] },
            { name: "g2", items: ["c"] },
        ],
    });
    assert_eq!(
        render(
            "[[#each groups]][[#each items]][[.]][[../../name]] [[/each]][[/each]]",
            model
        ),
        "ag1 bg1 cg2 "
    );
}

#[test]
fn render_parent_above_root_stays_at_root() {
    let model = value!({ name: "root" });
    assert_eq!(render("[[../name]]", model.clone()), "root");
    assert_eq!(render("[[../../../name]]", model), "root");
}

#[test]
fn render_loop_err_scalar_target() {
    let engine = Engine::new();
    let err = engine
        .compile("[[#each data]]x[[/each]]")
        .unwrap()
        .render(value!({ data: 1 }))
        .unwrap_err();
    assert_eq!(
        err.to_string(),
        "'data' is used like an array by the template, but is a scalar \
         value or object in your model between bytes 8 and 12"
    );
}

#[test]
fn render_loop_err_map_target() {
    let engine = Engine::new();
    let err = engine
        .compile("[[#each data]]x[[/each]]")
        .unwrap()
        .render(value!({ data: { a: 1 } }))
        .unwrap_err();
    assert!(err.to_string().contains("used like an array"));
}

#[test]
fn render_loop_err_keeps_written_prefix() {
    let engine = Engine::new();
    let template = engine.compile("before|[[#each data]]x[[/each]]").unwrap();
    let mut buf = Vec::new();
    let err = template.render_to_writer(&mut buf, value!({ data: "no" }));
    assert!(err.is_err());
    assert_eq!(buf, b"before|");
}

#[test]
fn render_to_writer() {
    let engine = Engine::new();
    let template = engine.compile("hello [[name]]").unwrap();
    let mut buf = Vec::new();
    template
        .render_to_writer(&mut buf, value!({ name: "world" }))
        .unwrap();
    assert_eq!(buf, b"hello world");
}

#[test]
fn render_max_output_bytes() {
    let mut engine = Engine::new();
    engine.set_max_output_bytes(4);
    let template = engine.compile("[[#each items]][[.]][[/each]]").unwrap();
    let model = value!({ items: [" ", " ", " ", " ", " ", " "] });
    assert_eq!(template.render(model).unwrap(), "    ");
}

#[test]
fn render_max_output_bytes_larger_than_output() {
    let mut engine = Engine::new();
    engine.set_max_output_bytes(100);
    let template = engine.compile("[[a]]").unwrap();
    assert_eq!(template.render(value!({ a: "short" })).unwrap(), "short");
}

#[test]
fn render_max_output_bytes_cuts_mid_content() {
    let mut engine = Engine::new();
    engine.set_max_output_bytes(7);
    let template = engine.compile("[[a]] and more").unwrap();
    assert_eq!(template.render(value!({ a: "value" })).unwrap(), "value a");
}

#[test]
fn render_formatter_with_argument() {
    let mut engine = Engine::new();
    engine.add_formatter(ValueKind::String, |value, arg| match (value, arg) {
        (Value::String(s), Some("upper")) => Value::String(s.to_uppercase()),
        (value, _) => value.clone(),
    });
    let result = engine
        .compile("[[name(upper)]]")
        .unwrap()
        .render(value!({ name: "ada" }))
        .unwrap();
    assert_eq!(result, "ADA");
}

#[test]
fn render_formatter_applies_to_plain_substitution() {
    // plain tags run the formatter with no argument
    let mut engine = Engine::new();
    engine.add_formatter(ValueKind::Integer, |value, _| match value {
        Value::Integer(i) => Value::String(format!("#{i}")),
        value => value.clone(),
    });
    let result = engine
        .compile("[[n]]")
        .unwrap()
        .render(value!({ n: 7 }))
        .unwrap();
    assert_eq!(result, "#7");
}

#[test]
fn render_formatter_any_is_fallback() {
    let mut engine = Engine::new();
    engine.add_formatter(ValueKind::Any, |_, _| Value::String("any".into()));
    engine.add_formatter(ValueKind::Integer, |_, _| Value::String("int".into()));
    let result = engine
        .compile("[[a(x)]] [[b(x)]]")
        .unwrap()
        .render(value!({ a: 1, b: "s" }))
        .unwrap();
    assert_eq!(result, "int any");
}

#[test]
fn render_formatter_missing_is_identity() {
    // no formatter for strings registered, the argument is ignored
    assert_eq!(
        render("[[date(dd.MM.yyyy)]]", value!({ date: "2018-01-31" })),
        "2018-01-31"
    );
}

#[test]
fn render_formatter_output_is_not_escaped() {
    let mut engine = Engine::new();
    engine.add_formatter(ValueKind::String, |_, _| Value::String("{raw}".into()));
    let result = engine
        .compile("[[text(x)]]")
        .unwrap()
        .render(value!({ text: "anything" }))
        .unwrap();
    assert_eq!(result, "{raw}");
}

#[test]
fn render_formatter_chain_into_opaque_result_is_empty() {
    // the formatted result is a plain string, so `.Year` resolves to
    // nothing
    let mut engine = Engine::new();
    engine.add_formatter(ValueKind::String, |value, arg| match (value, arg) {
        (Value::String(s), Some("d")) => Value::String(s.replace('-', ".")),
        (value, _) => value.clone(),
    });
    let result = engine
        .compile("[[data(d).Year]]")
        .unwrap()
        .render(value!({ data: "2018-01-31" }))
        .unwrap();
    assert_eq!(result, "");
}

#[test]
fn render_formatter_chain_into_map_result() {
    let mut engine = Engine::new();
    engine.add_formatter(ValueKind::String, |_, _| {
        value!({ Year: 2018, Month: 1 })
    });
    let result = engine
        .compile("[[data(d).Year]]")
        .unwrap()
        .render(value!({ data: "2018-01-31" }))
        .unwrap();
    assert_eq!(result, "2018");
}

#[test]
fn render_formatter_inside_section() {
    let mut engine = Engine::new();
    engine.add_formatter(ValueKind::String, |value, arg| match (value, arg) {
        (Value::String(s), Some("d")) => Value::String(s.replace('-', ".")),
        (value, _) => value.clone(),
    });
    let result = engine
        .compile("Date: [[#obj]][[date(d)]][[/obj]]")
        .unwrap()
        .render(value!({ obj: { date: "31-01-2018" } }))
        .unwrap();
    assert_eq!(result, "Date: 31.01.2018");
}

#[test]
fn render_formatter_on_nested_path() {
    // the format buffer must not leak into the following tag
    let mut engine = Engine::new();
    engine.add_formatter(ValueKind::String, |value, arg| match (value, arg) {
        (Value::String(s), Some("d")) => Value::String(s.replace('-', ".")),
        (value, _) => value.clone(),
    });
    let result = engine
        .compile("Date: [[obj.date(d)]][[obj2]]")
        .unwrap()
        .render(value!({ obj: { date: "31-01-2018" }, obj2: "." }))
        .unwrap();
    assert_eq!(result, "Date: 31.01.2018.");
}

#[test]
fn render_formatter_missing_path_prints_null_text() {
    let mut engine = Engine::new();
    engine.set_null_text("-");
    let result = engine
        .compile("[[nope(d)]]")
        .unwrap()
        .render(value!({}))
        .unwrap();
    assert_eq!(result, "-");
}

#[test]
fn render_query_in_loop_prints_item() {
    let model = value!({ data: ["x", "y"] });
    assert_eq!(render("[[#each data]][[?]][[/each]]", model), "xy");
}

#[test]
fn render_self_in_section() {
    let model = value!({ word: "hi" });
    assert_eq!(render("[[#word]][[.]][[/word]]", model), "hi");
}

#[test]
fn render_cancellation_before_start() {
    let cancel = AtomicBool::new(true);
    let engine = Engine::new();
    let template = engine
        .compile("[[#each items]][[.]][[/each]]")
        .unwrap();
    let result = template
        .render_cancellable(value!({ items: ["a", "b"] }), &cancel)
        .unwrap();
    assert_eq!(result, "");
}

#[test]
fn render_cancellation_mid_render() {
    use std::sync::Arc;

    // the formatter flips the shared flag while rendering `b`, so `c` is
    // never reached
    let cancel = Arc::new(AtomicBool::new(false));
    let mut engine = Engine::new();
    let shared = Arc::clone(&cancel);
    engine.add_formatter(ValueKind::String, move |value, _| {
        if let Value::String(s) = value {
            if s == "CANCEL" {
                shared.store(true, Ordering::Relaxed);
            }
        }
        value.clone()
    });
    let template = engine.compile("[[a]][[b]][[c]]").unwrap();
    let model = value!({ a: "1", b: "CANCEL", c: "3" });
    let result = template.render_cancellable(model, &cancel).unwrap();
    assert_eq!(result, "1CANCEL");
}

#[test]
fn render_serde_struct_model() {
    #[derive(serde::Serialize)]
    struct Company {
        name: String,
        employees: Vec<Employee>,
    }

    #[derive(serde::Serialize)]
    struct Employee {
        name: String,
        boss: bool,
    }

    let model = Company {
        name: "Initech".into(),
        employees: vec![
            Employee {
                name: "Peter".into(),
                boss: false,
            },
            Employee {
                name: "Bill".into(),
                boss: true,
            },
        ],
    };

    let engine = Engine::new();
    let result = engine
        .compile("[[name]]: [[#each employees]][[name]][[#boss]]*[[/boss]] [[/each]]")
        .unwrap()
        .render(&model)
        .unwrap();
    assert_eq!(result, "Initech: Peter Bill* ");
}

#[test]
fn render_engine_is_send_and_sync() {
    fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<Engine>();
}
