use std::sync::{Arc, Mutex};

use doc_enumerable::db::{Database, DocumentStore};
use doc_enumerable::enumerable::*;
use doc_enumerable::models::*;
use serde_json::{json, Value};
use speculate2::speculate;

const STATUSES: [&str; 4] = ["completed", "running", "failed", "waiting"];

type Calls = Arc<Mutex<Vec<(String, String, String)>>>;

fn build_model(declaration: Enumerable) -> Model {
    let mut model = Model::new("Build");
    model.enumerable(declaration).expect("Failed to declare enumerable");
    model
}

/// Callback recording `(name, old, new)` and returning `result`.
fn recording_callback(calls: &Calls, name: &str, result: Value) -> Callback {
    let calls = Arc::clone(calls);
    let name = name.to_string();
    Callback::change(move |_, old, new| {
        calls
            .lock()
            .unwrap()
            .push((name.clone(), old.to_string(), new.to_string()));
        result.clone()
    })
}

fn recorded(calls: &Calls) -> Vec<(String, String, String)> {
    calls.lock().unwrap().clone()
}

fn call(name: &str, old: &str, new: &str) -> (String, String, String) {
    (name.to_string(), old.to_string(), new.to_string())
}

speculate! {
    before {
        let db = Database::open_memory().expect("Failed to create in-memory database");
        db.migrate().expect("Failed to run migrations");
    }

    describe "with prefix" {
        it "updates the stored value through the prefixed mutator" {
            let model = build_model(Enumerable::new("status", STATUSES).default_value("waiting").prefix("st_"));
            let mut doc = model.new_document();

            let output = model.call(&db, &mut doc, "st_completed!").expect("Mutator failed");

            assert_eq!(output, MemberOutput::Transition(Transition {
                field: "status".to_string(),
                from: "waiting".to_string(),
                to: "completed".to_string(),
                applied: true,
            }));
            let stored = db.get_document(doc.id).expect("Query failed").expect("Document not saved");
            assert_eq!(stored.get_str("status"), Some("completed"));
        }

        it "answers prefixed predicates" {
            let model = build_model(Enumerable::new("status", STATUSES).default_value("waiting").prefix("st_"));
            let mut doc = model.new_document();

            model.call(&db, &mut doc, "st_completed!").expect("Mutator failed");
            assert_eq!(model.call(&db, &mut doc, "st_completed?").unwrap(), MemberOutput::Predicate(true));

            model.call(&db, &mut doc, "st_waiting!").expect("Mutator failed");
            assert_eq!(model.call(&db, &mut doc, "st_completed?").unwrap(), MemberOutput::Predicate(false));
        }

        it "does not generate unprefixed members" {
            let model = build_model(Enumerable::new("status", STATUSES).prefix("st_"));
            assert!(model.responds_to("st_completed?"));
            assert!(!model.responds_to("completed?"));
            assert!(!model.responds_to("completed!"));
        }

        it "lists all values regardless of prefix" {
            let model = build_model(Enumerable::new("status", STATUSES).prefix("st_"));
            assert_eq!(model.introspect("all_status").unwrap(), STATUSES);
            assert!(model.introspect("all_st_status").is_none());
        }

        it "accepts owned strings for field and values" {
            let values: Vec<String> = STATUSES.iter().map(|s| s.to_string()).collect();
            let model = build_model(Enumerable::new(String::from("status"), values).prefix("st_"));
            assert!(model.responds_to("st_completed?"));
        }
    }

    describe "without prefix" {
        it "makes exactly one predicate true after each mutator" {
            let model = build_model(Enumerable::new("status", STATUSES));
            let field = model.enum_field("status").unwrap();
            let mut doc = model.new_document();

            for value in STATUSES {
                field.set(&db, &mut doc, value).expect("Mutator failed");
                for other in STATUSES {
                    assert_eq!(field.is(&doc, other), other == value, "after {value}, {other}?");
                }
            }
        }

        it "rejects values that were not declared" {
            let model = build_model(Enumerable::new("status", STATUSES));
            let mut doc = model.new_document();
            let err = model.enum_field("status").unwrap().set(&db, &mut doc, "archived").unwrap_err();

            assert!(matches!(err, EnumerableError::UnknownValue { .. }));
            assert_eq!(doc.get_str("status"), Some("completed"));
        }

        it "fails on undefined members" {
            let model = build_model(Enumerable::new("status", STATUSES));
            let mut doc = model.new_document();
            let err = model.call(&db, &mut doc, "dead!").unwrap_err();
            assert_eq!(err.to_string(), "undefined method `dead!` for Build");
        }

        it "keeps members of models with the same values apart" {
            let model = build_model(Enumerable::new("status", STATUSES));
            let mut other = Model::new("Job");
            other.enumerable(Enumerable::new("other_field", ["completed", "dead"])).unwrap();

            let mut other_doc = other.new_document();
            other.call(&db, &mut other_doc, "dead!").expect("Mutator failed");

            assert!(other.responds_to("dead?"));
            assert!(!model.responds_to("dead?"));

            let mut doc = model.new_document();
            model.call(&db, &mut doc, "completed!").expect("Mutator failed");
            assert!(model.enum_field("status").unwrap().is(&doc, "completed"));
            assert!(other.enum_field("other_field").unwrap().is(&other_doc, "dead"));
        }

        it "rejects a second attribute whose members collide" {
            let mut model = build_model(Enumerable::new("status", STATUSES));
            let err = model.enumerable(Enumerable::new("outcome", ["passed", "failed"])).unwrap_err();
            assert_eq!(err.to_string(), "`failed!` is already defined on Build");

            model.enumerable(Enumerable::new("outcome", ["passed", "failed"]).prefix("outcome_"))
                .expect("Prefixed declaration should not collide");
            assert!(model.responds_to("outcome_failed!"));
        }

        it "rejects declaring the same field twice" {
            let mut model = build_model(Enumerable::new("status", STATUSES));
            let err = model.enumerable(Enumerable::new("status", ["x"]).prefix("p_")).unwrap_err();
            assert!(matches!(err, EnumerableError::FieldAlreadyDeclared { .. }));
        }
    }

    describe "default value" {
        it "starts with the declared default" {
            let model = build_model(Enumerable::new("status", STATUSES).default_value("waiting"));
            let field = model.enum_field("status").unwrap();
            let doc = model.new_document();

            assert!(!field.is(&doc, "completed"));
            assert!(field.is(&doc, "waiting"));
        }

        it "starts with the first value when no default is declared" {
            let model = build_model(Enumerable::new("status", STATUSES));
            let doc = model.new_document();

            assert_eq!(doc.get_str("status"), Some("completed"));
            assert_eq!(model.fields(), [FieldDeclaration {
                name: "status".to_string(),
                default: json!("completed"),
            }]);
        }

        it "reads a missing field as the default" {
            let model = build_model(Enumerable::new("status", STATUSES).default_value("running"));
            let field = model.enum_field("status").unwrap();
            let doc = Document::new("Build", "builds");

            assert_eq!(field.current(&doc), Some("running"));
            assert!(field.is(&doc, "running"));
        }

        it "is not enforced on direct assignment" {
            let model = build_model(Enumerable::new("status", STATUSES));
            let field = model.enum_field("status").unwrap();
            let mut doc = model.new_document();
            doc.set("status", "bogus");

            assert_eq!(field.current(&doc), Some("bogus"));
            assert!(STATUSES.iter().all(|v| !field.is(&doc, v)));
        }

        it "does not read a stored null or number as the default" {
            let model = build_model(Enumerable::new("status", STATUSES));
            let field = model.enum_field("status").unwrap();

            for stored in [Value::Null, json!(5)] {
                let mut doc = model.new_document();
                doc.set("status", stored.clone());
                db.save(&doc).expect("Failed to save");

                assert_eq!(field.current(&doc), None);
                for value in STATUSES {
                    let predicate = model.call(&db, &mut doc, &format!("{value}?")).unwrap();
                    assert_eq!(predicate, MemberOutput::Predicate(false), "{stored} answered {value}?");
                }
                let hits = db.find(&model.scope("completed").unwrap()).unwrap();
                assert!(hits.iter().all(|d| d.id != doc.id));
            }
        }

        it "hands hooks the JSON text of a non-string old value" {
            let calls: Calls = Arc::default();
            let mut model = Model::new("Build");
            model.define_callback("status_changed", recording_callback(&calls, "status_changed", Value::Null));
            model.enumerable(
                Enumerable::new("status", STATUSES).after_change(AfterChange::named("status_changed")),
            ).unwrap();

            let mut nulled = model.new_document();
            nulled.set("status", Value::Null);
            let output = model.call(&db, &mut nulled, "running!").unwrap();
            let mut numbered = model.new_document();
            numbered.set("status", json!(5));
            model.call(&db, &mut numbered, "failed!").unwrap();

            assert!(matches!(output, MemberOutput::Transition(Transition { ref from, applied: true, .. }) if from == "null"));
            assert_eq!(recorded(&calls), vec![
                call("status_changed", "null", "running"),
                call("status_changed", "5", "failed"),
            ]);
            assert_eq!(nulled.get_str("status"), Some("running"));
        }
    }

    describe "scopes" {
        it "defines a prefixed scope per value" {
            let model = build_model(Enumerable::new("status", STATUSES).prefix("build_"));

            for value in STATUSES {
                let criteria = model.scope(&format!("build_{value}")).expect("Scope missing");
                assert_eq!(criteria.selector().get("status"), Some(&json!(value)));
                assert_eq!(criteria.selector().len(), 1);
                assert_eq!(criteria.model(), "Build");
            }
            assert!(model.scope("completed").is_none());
        }

        it "can key scopes by the bare value" {
            let model = build_model(
                Enumerable::new("status", STATUSES).prefix("build_").scope_naming(ScopeNaming::Bare),
            );
            assert!(model.scope("failed").is_some());
            assert!(model.scope("build_failed").is_none());
            assert!(model.responds_to("build_failed!"));
        }

        it "does not define scopes on other models" {
            let _prefixed = build_model(Enumerable::new("status", STATUSES).prefix("st_"));
            let other = build_model(Enumerable::new("status", STATUSES));
            assert!(!other.defines_class_member("st_completed"));
            assert!(other.defines_class_member("completed"));
        }

        it "filters stored documents" {
            let model = build_model(Enumerable::new("status", STATUSES));
            let field = model.enum_field("status").unwrap();

            let mut failed = model.new_document();
            field.set(&db, &mut failed, "failed").unwrap();
            let mut running = model.new_document();
            field.set(&db, &mut running, "running").unwrap();
            let mut also_failed = model.new_document();
            field.set(&db, &mut also_failed, "failed").unwrap();

            let found = db.find(&field.scope_for("failed").unwrap()).expect("Query failed");
            let ids: Vec<_> = found.iter().map(|d| d.id).collect();
            assert_eq!(found.len(), 2);
            assert!(ids.contains(&failed.id));
            assert!(ids.contains(&also_failed.id));
            assert!(field.scope_for("archived").is_none());
        }

        it "preserves the subclass in criteria" {
            let parent = build_model(Enumerable::new("status", STATUSES));
            let child = parent.subclass("NightlyBuild");

            let mut parent_doc = parent.new_document();
            parent.call(&db, &mut parent_doc, "completed!").unwrap();
            let mut child_doc = child.new_document();
            child.call(&db, &mut child_doc, "completed!").unwrap();

            let criteria = child.scope("completed").unwrap();
            assert_eq!(criteria.model(), "NightlyBuild");

            let from_child = db.find(&criteria).unwrap();
            assert_eq!(from_child.len(), 1);
            assert_eq!(from_child[0].id, child_doc.id);

            let from_parent = db.find(&parent.scope("completed").unwrap()).unwrap();
            assert_eq!(from_parent.len(), 2);
        }

        it "includes deeper subclasses in an intermediate subclass scope" {
            let build = build_model(Enumerable::new("status", STATUSES));
            let nightly = build.subclass("NightlyBuild");
            let arm = nightly.subclass("ArmNightlyBuild");
            let mut registry = ModelRegistry::new();
            registry.register(build).unwrap();
            registry.register(nightly).unwrap();
            registry.register(arm).unwrap();

            let build = registry.get("Build").unwrap();
            let nightly = registry.get("NightlyBuild").unwrap();
            let arm = registry.get("ArmNightlyBuild").unwrap();

            let mut build_doc = build.new_document();
            build.call(&db, &mut build_doc, "completed!").unwrap();
            let mut arm_doc = arm.new_document();
            arm.call(&db, &mut arm_doc, "completed!").unwrap();

            let hits = |model: &Model| -> Vec<_> {
                db.find(&model.scope("completed").unwrap()).unwrap().iter().map(|d| d.id).collect()
            };
            assert_eq!(hits(build).len(), 2);
            assert_eq!(hits(nightly), vec![arm_doc.id]);
            assert_eq!(hits(arm), vec![arm_doc.id]);
        }
    }

    describe "before_change" {
        it "passes the old and new value to a named callback" {
            let calls: Calls = Arc::default();
            let mut model = Model::new("Build");
            model.define_callback("status_will_change", recording_callback(&calls, "status_will_change", json!(true)));
            model.enumerable(
                Enumerable::new("status", STATUSES).before_change(BeforeChange::named("status_will_change")),
            ).unwrap();

            let mut doc = model.new_document();
            let output = model.call(&db, &mut doc, "running!").unwrap();

            assert_eq!(recorded(&calls), vec![call("status_will_change", "completed", "running")]);
            assert!(matches!(output, MemberOutput::Transition(Transition { applied: true, .. })));
            assert_eq!(doc.get_str("status"), Some("running"));
        }

        it "treats a null result as a veto" {
            let calls: Calls = Arc::default();
            let mut model = Model::new("Build");
            model.define_callback("status_will_change", recording_callback(&calls, "status_will_change", Value::Null));
            model.enumerable(
                Enumerable::new("status", STATUSES).before_change(BeforeChange::named("status_will_change")),
            ).unwrap();

            let mut doc = model.new_document();
            let output = model.call(&db, &mut doc, "running!").unwrap();

            assert!(matches!(output, MemberOutput::Transition(Transition { applied: false, .. })));
            assert_eq!(doc.get_str("status"), Some("completed"));
            assert!(db.get_document(doc.id).unwrap().is_none());
        }

        it "only calls the callback of the model being changed" {
            let calls: Calls = Arc::default();
            let mut model = Model::new("Build");
            model.define_callback("status_will_change", recording_callback(&calls, "build", json!(true)));
            model.enumerable(
                Enumerable::new("status", STATUSES).before_change(BeforeChange::named("status_will_change")),
            ).unwrap();

            let mut other = Model::new("Job");
            other.define_callback("status_will_change", recording_callback(&calls, "job", json!(true)));
            other.enumerable(
                Enumerable::new("status", ["completed", "dead"]).before_change(BeforeChange::named("status_will_change")),
            ).unwrap();

            let mut doc = model.new_document();
            model.call(&db, &mut doc, "running!").unwrap();

            assert_eq!(recorded(&calls), vec![call("build", "completed", "running")]);
        }

        it "accepts variadic callbacks" {
            let seen = Arc::new(Mutex::new(Vec::new()));
            let sink = Arc::clone(&seen);
            let mut model = Model::new("Build");
            model.define_callback("anything", Callback::new(Arity::Variadic, move |_, args| {
                sink.lock().unwrap().extend(args.iter().cloned());
                json!(true)
            }));
            model.enumerable(
                Enumerable::new("status", STATUSES).before_change(BeforeChange::named("anything")),
            ).unwrap();

            let mut doc = model.new_document();
            model.call(&db, &mut doc, "failed!").unwrap();

            assert_eq!(*seen.lock().unwrap(), vec![json!("completed"), json!("failed")]);
            assert_eq!(doc.get_str("status"), Some("failed"));
        }

        it "rejects a callback with the wrong number of parameters" {
            let mut model = Model::new("Build");
            model.define_callback("status_will_change", Callback::new(Arity::Fixed(1), |_, _| json!(true)));
            model.enumerable(
                Enumerable::new("status", STATUSES).before_change(BeforeChange::named("status_will_change")),
            ).unwrap();

            let mut doc = model.new_document();
            let err = model.call(&db, &mut doc, "running!").unwrap_err();

            assert_eq!(
                err.to_string(),
                "Method status_will_change must receive two parameters: old_value and new_value"
            );
            assert_eq!(doc.get_str("status"), Some("completed"));
            assert!(db.get_document(doc.id).unwrap().is_none());
        }

        it "fails when the callback is not defined" {
            let model = build_model(
                Enumerable::new("status", STATUSES).before_change(BeforeChange::named("missing")),
            );
            let mut doc = model.new_document();
            let err = model.call(&db, &mut doc, "running!").unwrap_err();
            assert!(matches!(err, EnumerableError::MissingCallback { ref name, .. } if name == "missing"));
        }

        it "gates the change with an inline hook" {
            let model = build_model(
                Enumerable::new("status", STATUSES)
                    .before_change(BeforeChange::inline(|_, _, new| new != "failed")),
            );
            let field = model.enum_field("status").unwrap();
            let mut doc = model.new_document();

            assert!(!field.set(&db, &mut doc, "failed").unwrap().applied);
            assert!(field.is(&doc, "completed"));
            assert!(field.set(&db, &mut doc, "running").unwrap().applied);
            assert!(field.is(&doc, "running"));
        }
    }

    describe "after_change" {
        it "runs after an allowed change and not after a vetoed one" {
            let calls: Calls = Arc::default();
            let mut model = Model::new("Build");
            model.define_callback("status_will_change", Callback::change(|_, _, new| json!(new != "failed")));
            model.define_callback("status_changed", recording_callback(&calls, "status_changed", Value::Null));
            model.enumerable(
                Enumerable::new("status", STATUSES)
                    .before_change(BeforeChange::named("status_will_change"))
                    .after_change(AfterChange::named("status_changed")),
            ).unwrap();

            let mut doc = model.new_document();
            model.call(&db, &mut doc, "running!").unwrap();
            model.call(&db, &mut doc, "failed!").unwrap();

            assert_eq!(recorded(&calls), vec![call("status_changed", "completed", "running")]);
            assert_eq!(doc.get_str("status"), Some("running"));
        }

        it "sees the stored value when it runs" {
            let store = db.clone();
            let observed = Arc::new(Mutex::new(None));
            let sink = Arc::clone(&observed);
            let model = build_model(
                Enumerable::new("status", STATUSES).after_change(AfterChange::inline(move |doc, _, _| {
                    let stored = store.get_document(doc.id).unwrap().unwrap();
                    *sink.lock().unwrap() = stored.get_str("status").map(str::to_string);
                })),
            );

            let mut doc = model.new_document();
            model.call(&db, &mut doc, "waiting!").unwrap();

            assert_eq!(observed.lock().unwrap().as_deref(), Some("waiting"));
        }

        it "rejects a callback with the wrong number of parameters before writing" {
            let mut model = Model::new("Build");
            model.define_callback("status_changed", Callback::new(Arity::Fixed(1), |_, _| Value::Null));
            model.enumerable(
                Enumerable::new("status", STATUSES).after_change(AfterChange::named("status_changed")),
            ).unwrap();

            let mut doc = model.new_document();
            let err = model.call(&db, &mut doc, "running!").unwrap_err();

            assert_eq!(
                err.to_string(),
                "Method status_changed must receive two parameters: old_value and new_value"
            );
            assert_eq!(doc.get_str("status"), Some("completed"));
            assert!(db.get_document(doc.id).unwrap().is_none());
        }
    }
}
