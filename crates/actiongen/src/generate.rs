//! Per-unit code generation.
//!
//! Turns one parsed compilation unit into generated subclasses: event
//! methods become installed view listeners, model fields get load/put/
//! recollect chains, and every processed body runs through define
//! substitution, macro rewriting and action synthesis.

use crate::host::SourceUnit;
use action_diagnostics::DiagnosticSink;
use action_model::{
    ActionRegistry, Annotation, CompilationUnitImports, DefineEntry, Defines, Element,
    ElementKind,
};
use action_transformer::{
    emit_load, emit_put, emit_recollect, process_block, Backend, BlockRef, BodyEncoding,
    BuildContext, JavaWriter, ListenerKind, ModelSpec, RequestDescriptor, SynthesisError,
    ViewListenerHolder,
};
use source_span::Span;

/// One generated compilation unit, ready for the filer.
#[derive(Debug)]
pub struct GeneratedUnit {
    pub qualified_name: String,
    pub content: String,
}

/// Generates subclasses for every class of `unit` that needs one.
pub fn generate_units(
    unit: &SourceUnit,
    registry: &ActionRegistry,
    global_defines: &[String],
    sink: &mut DiagnosticSink,
) -> Vec<GeneratedUnit> {
    let defines = parse_defines(unit, global_defines, sink);
    let mut generated = Vec::new();

    for id in &unit.types {
        let Some(class) = unit.arena.get(*id) else {
            continue;
        };
        if class.kind != ElementKind::Class {
            continue;
        }
        // Holders are consumed by call sites, never subclassed.
        if class.annotations.iter().any(|a| a.name == "ActionFor") {
            continue;
        }
        if !needs_generation(unit, class) {
            continue;
        }
        generated.push(generate_class(unit, class, registry, &defines, sink));
    }

    generated
}

fn parse_defines(
    unit: &SourceUnit,
    global_defines: &[String],
    sink: &mut DiagnosticSink,
) -> Defines {
    let mut entries: Vec<DefineEntry> = global_defines
        .iter()
        .map(|text| DefineEntry {
            text: text.clone(),
            span: Span::default(),
        })
        .collect();
    entries.extend(
        unit.define_entries()
            .into_iter()
            .map(|(text, span)| DefineEntry { text, span }),
    );
    Defines::parse(&entries, sink)
}

/// Maps an event annotation name to the listener it installs.
fn listener_kind(annotation: &Annotation) -> Option<ListenerKind> {
    match annotation.name.as_str() {
        "Click" => Some(ListenerKind::Click),
        "LongClick" => Some(ListenerKind::LongClick),
        "ItemClick" => Some(ListenerKind::ItemClick),
        "ItemLongClick" => Some(ListenerKind::ItemLongClick),
        "EditorAction" => Some(ListenerKind::EditorAction),
        "Touch" => Some(ListenerKind::Touch),
        "FocusChange" => Some(ListenerKind::FocusChange),
        _ => None,
    }
}

fn needs_generation(unit: &SourceUnit, class: &Element) -> bool {
    for member in unit.arena.children(class.id) {
        match member.kind {
            ElementKind::Method => {
                if member.annotations.iter().any(|a| listener_kind(a).is_some()) {
                    return true;
                }
                if unit
                    .bodies
                    .get(&member.id)
                    .map(|body| body.contains('$'))
                    .unwrap_or(false)
                {
                    return true;
                }
            }
            ElementKind::Field => {
                if member.annotations.iter().any(|a| a.name == "Model") {
                    return true;
                }
            }
            _ => {}
        }
    }
    false
}

fn generate_class(
    unit: &SourceUnit,
    class: &Element,
    registry: &ActionRegistry,
    defines: &Defines,
    sink: &mut DiagnosticSink,
) -> GeneratedUnit {
    let generated_name = registry.generated_name(&class.name);
    let mut imports = unit.imports.clone();
    let mut writer = JavaWriter::new(unit.package.clone(), &generated_name);
    writer.extends(class.name.as_str());

    let mut listeners = ViewListenerHolder::new();
    let init_block = writer.add_method("protected void init_()");

    for method in method_children(unit, class) {
        let Some(body) = unit.bodies.get(&method.id) else {
            continue;
        };
        let event = method.annotations.iter().find_map(|a| {
            listener_kind(a).map(|kind| {
                let target = a.value().unwrap_or(method.name.as_str()).to_string();
                (kind, target, a.span)
            })
        });
        let has_macros = body.contains('$');
        if event.is_none() && !has_macros {
            continue;
        }

        let body = defines.apply(body);
        let mut ctx = BuildContext::new(
            registry,
            method.id,
            &generated_name,
            class.name.as_str(),
            &mut imports,
            sink,
            method.span,
        );

        match event {
            Some((kind, target, span)) => {
                let listener_body = listeners.create_listener(
                    kind,
                    &target,
                    &init_block,
                    &mut *ctx.imports,
                    &mut *ctx.sink,
                    span,
                );
                if let Err(SynthesisError::ActionCallSuper { .. }) =
                    process_block(&body, &listener_body, &mut ctx)
                {
                    listener_body
                        .borrow_mut()
                        .add_statement(super_delegation(&generated_name, method, unit));
                }
            }
            None => {
                let block = writer.add_method(override_signature(method, unit));
                if let Err(SynthesisError::ActionCallSuper { .. }) =
                    process_block(&body, &block, &mut ctx)
                {
                    block
                        .borrow_mut()
                        .add_statement(super_delegation(&generated_name, method, unit));
                }
            }
        }
    }

    for field in unit
        .arena
        .children(class.id)
        .filter(|f| f.kind == ElementKind::Field)
    {
        let Some(annotation) = field.annotations.iter().find(|a| a.name == "Model") else {
            continue;
        };
        let spec = model_spec(unit, class, field, annotation);
        emit_model_methods(&mut writer, &init_block, &spec, annotation, &mut imports);
    }

    for fq in imports.declared() {
        writer.add_import(fq);
    }
    for fq in imports.ensured() {
        writer.add_import(fq);
    }

    GeneratedUnit {
        qualified_name: writer.qualified_name(),
        content: writer.render(),
    }
}

fn method_children<'a>(
    unit: &'a SourceUnit,
    class: &Element,
) -> impl Iterator<Item = &'a Element> {
    unit.arena
        .children(class.id)
        .filter(|m| m.kind == ElementKind::Method)
}

fn override_signature(method: &Element, unit: &SourceUnit) -> String {
    let params: Vec<String> = unit
        .arena
        .children(method.id)
        .filter(|p| p.kind == ElementKind::Parameter)
        .map(|p| format!("{} {}", p.ty.as_str(), p.name))
        .collect();
    format!(
        "public {} {}({})",
        method.ty.as_str(),
        method.name,
        params.join(", ")
    )
}

/// `Generated_.super.method(args)`, valid both in methods and listeners.
fn super_delegation(generated_name: &str, method: &Element, unit: &SourceUnit) -> String {
    let args: Vec<&str> = unit
        .arena
        .children(method.id)
        .filter(|p| p.kind == ElementKind::Parameter)
        .map(|p| p.name.as_str())
        .collect();
    let call = format!(
        "{}.super.{}({})",
        generated_name,
        method.name,
        args.join(", ")
    );
    if method.ty.as_str() == "void" {
        call
    } else {
        format!("return {}", call)
    }
}

fn model_spec(
    unit: &SourceUnit,
    class: &Element,
    field: &Element,
    annotation: &Annotation,
) -> ModelSpec {
    let backend = match annotation.arg("url") {
        Some(url) => Backend::Remote(RequestDescriptor {
            method: annotation.arg("method").unwrap_or("GET").to_string(),
            url: url.to_string(),
            headers: annotation
                .args
                .iter()
                .filter(|(key, _)| key == "headers")
                .filter_map(|(_, value)| {
                    value
                        .split_once(':')
                        .map(|(name, v)| (name.trim().to_string(), v.trim().to_string()))
                })
                .collect(),
            encoding: if annotation.arg("encoding") == Some("form") {
                BodyEncoding::Form
            } else {
                BodyEncoding::Json
            },
            mock: annotation.bool_arg("mock", false),
            mock_response: annotation.arg("mockResponse").map(str::to_string),
        }),
        None => Backend::Local,
    };

    let callback = |name: &str| {
        method_children(unit, class)
            .find(|m| m.annotations.iter().any(|a| a.name == name))
            .map(|m| m.name.to_string())
    };

    ModelSpec {
        field: field.name.to_string(),
        ty: field.ty.simple_name().to_string(),
        async_load: annotation.bool_arg("async", false),
        async_put: annotation.bool_arg("asyncPut", false),
        lazy: annotation.bool_arg("lazy", false),
        handle_exceptions: annotation.bool_arg("handleExceptions", false),
        query: annotation.arg("query").unwrap_or_default().to_string(),
        fields: annotation
            .args
            .iter()
            .filter(|(key, _)| key == "fields")
            .map(|(_, value)| value.clone())
            .collect(),
        backend,
        after_load: callback("AfterLoad"),
        after_put: callback("AfterPut"),
    }
}

fn emit_model_methods(
    writer: &mut JavaWriter,
    init_block: &BlockRef,
    spec: &ModelSpec,
    annotation: &Annotation,
    imports: &mut CompilationUnitImports,
) {
    let load = writer.add_method(format!("public void _load_{}()", spec.field));
    emit_load(spec, &load, imports);

    let put = writer.add_method(format!("public void _put_{}()", spec.field));
    emit_put(spec, &put, imports);

    let recollect = writer.add_method(format!("public void _recollect_{}()", spec.field));
    emit_recollect(
        spec,
        &recollect,
        imports,
        annotation.bool_arg("validate", false),
    );

    if !spec.lazy {
        init_block
            .borrow_mut()
            .add_statement(format!("_load_{}()", spec.field));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::{parse_unit, register_actions};

    const HOLDER: &str = r#"
        package com.example.actions;

        import com.actiongen.api.ActionFor;
        import java.lang.Runnable;

        @ActionFor("Toast")
        public class ToastHolder {
            public ToastHolder init(String title) { return this; }
            void build(Runnable Done, Runnable Failed) {}
            void execute() {}
        }
    "#;

    const ACTIVITY: &str = r#"
        package com.example;

        import com.example.actions.ToastHolder;

        public class MainActivity {
            @Model(async = true, query = "id = {id}")
            User user;

            @Click("saveButton")
            void onSave() {
                $Toast("Saved");
                if ($Toast.Done) {
                    finish();
                }
            }

            void plain() {
                log("nothing to expand");
            }
        }
    "#;

    fn generate(source: &str) -> (Vec<GeneratedUnit>, Vec<action_diagnostics::Diagnostic>) {
        let mut sink = DiagnosticSink::new();
        let mut registry = ActionRegistry::new("_");
        let holder_unit = parse_unit(HOLDER, &mut sink);
        register_actions(&holder_unit, &mut registry);

        let unit = parse_unit(source, &mut sink);
        let generated = generate_units(&unit, &registry, &[], &mut sink);
        (generated, sink.into_diagnostics())
    }

    #[test]
    fn test_holder_classes_are_not_subclassed() {
        let mut sink = DiagnosticSink::new();
        let mut registry = ActionRegistry::new("_");
        let unit = parse_unit(HOLDER, &mut sink);
        register_actions(&unit, &mut registry);
        let generated = generate_units(&unit, &registry, &[], &mut sink);
        assert!(generated.is_empty());
    }

    #[test]
    fn test_activity_generates_suffixed_subclass() {
        let (generated, diags) = generate(ACTIVITY);
        assert!(diags.is_empty(), "{diags:?}");
        assert_eq!(generated.len(), 1);
        assert_eq!(generated[0].qualified_name, "com.example.MainActivity_");

        let content = &generated[0].content;
        assert!(content.contains("public final class MainActivity_ extends MainActivity"));
        // Listener installed in init_, synthesis inside the Done object.
        assert!(content.contains("saveButton.setOnClickListener(new View.OnClickListener()"));
        assert!(content.contains("toastAction0.init(\"Saved\");"));
        assert!(content.contains("toastAction0.execute();"));
        assert!(content.contains("finish();"));
        // Unannotated macro-free methods are untouched.
        assert!(!content.contains("plain()"));
    }

    #[test]
    fn test_model_field_gets_operation_chain() {
        let (generated, _) = generate(ACTIVITY);
        let content = &generated[0].content;
        assert!(content.contains("public void _load_user()"));
        assert!(content.contains("public void _put_user()"));
        assert!(content.contains("public void _recollect_user()"));
        // Eager model, loaded from init_.
        assert!(content.contains("_load_user();"));
    }

    #[test]
    fn test_defines_substitute_before_synthesis() {
        let source = r#"
            package p;
            @Define({"greeting=Hello"})
            class A {
                @Click("button")
                void onTap() {
                    $Toast("ignored");
                    show(greeting);
                }
            }
        "#;
        let (generated, _) = generate(source);
        assert!(generated[0].content.contains("show(Hello);"));
    }

    #[test]
    fn test_super_call_switches_to_delegation() {
        let source = r#"
            package p;
            class A {
                @Click("button")
                void onTap() {
                    super.$Toast("x");
                }
            }
        "#;
        let (generated, _) = generate(source);
        assert!(generated[0].content.contains("A_.super.onTap();"));
    }
}
