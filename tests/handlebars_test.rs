use std::collections::HashMap;
use std::sync::Once;
use ubars::{
    AccessorResolver, Context, FieldResolver, Handlebars, MapResolver, MethodResolver, Record,
    ResolverChain, ToValue, Value,
};

#[derive(Record, Clone, Default)]
#[record(getters, methods(isNew = is_new, isOld = is_old, hi))]
struct Model {
    name: String,
}

impl Model {
    fn named(name: &str) -> Self {
        Self {
            name: name.to_string(),
        }
    }

    fn is_new(&self) -> bool {
        true
    }

    fn is_old(&self) -> bool {
        false
    }

    fn hi(&self) -> String {
        "hi".to_string()
    }
}

#[derive(Record, Clone, Default)]
#[record(getters)]
struct Data {
    title: Option<String>,
    model: Option<Model>,
    age: Option<i32>,
}

impl Data {
    fn titled(title: &str) -> Self {
        Self {
            title: Some(title.to_string()),
            ..Default::default()
        }
    }

    fn with_model(mut self, model: Model) -> Self {
        self.model = Some(model);
        self
    }
}

static INIT: Once = Once::new();

fn init_logger() {
    INIT.call_once(|| {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("debug")).init();
    });
}

fn handlebars() -> Handlebars {
    init_logger();
    Handlebars::without_source()
}

fn data() -> Data {
    Data::titled("Title")
}

fn full_chain() -> ResolverChain {
    ResolverChain::new()
        .with(MapResolver)
        .with(AccessorResolver)
        .with(FieldResolver)
        .with(MethodResolver)
}

fn map_context(entries: Vec<(&str, Value)>) -> Context {
    let map: HashMap<String, Value> = entries
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect();
    Context::builder(&map).resolver(full_chain()).build()
}

fn render(template: &str, context: &Context) -> String {
    handlebars()
        .compile_inline(template)
        .unwrap()
        .render(context)
        .unwrap()
}

#[test]
fn test_compile_inline() {
    let template = handlebars().compile_inline("Hello {{this}}!").unwrap();
    assert_eq!(template.apply(&"Handlebars.rs").unwrap(), "Hello Handlebars.rs!");
}

#[test]
fn test_escape_and_unescape() {
    let hb = handlebars();
    let escaped = hb.compile_inline("Hello {{this}}!").unwrap();
    assert_eq!(escaped.apply(&"<html>").unwrap(), "Hello &lt;html&gt;!");

    let raw = hb.compile_inline("Hello {{{this}}}!").unwrap();
    assert_eq!(raw.apply(&"<html>").unwrap(), "Hello <html>!");

    let ampersand = hb.compile_inline("Hello {{&this}}!").unwrap();
    assert_eq!(ampersand.apply(&"<html>").unwrap(), "Hello <html>!");
}

#[test]
fn test_nested_path() {
    let hb = handlebars();
    let data = data().with_model(Model::named("TEST"));

    let template = hb.compile_inline("{{title}} <h1>{{model.name}}</h1>").unwrap();
    assert_eq!(template.apply(&data).unwrap(), "Title <h1>TEST</h1>");

    let context = Context::builder(&data).resolver(full_chain()).build();
    let template = hb.compile_inline("{{title}} <h1>{{model.getName}}</h1>").unwrap();
    assert_eq!(template.render(&context).unwrap(), "Title <h1>TEST</h1>");

    let template = hb.compile_inline("{{title}} <h1>{{model.isNew}}</h1>").unwrap();
    assert_eq!(template.render(&context).unwrap(), "Title <h1>true</h1>");
}

#[test]
fn test_if_on_methods() {
    let data = data().with_model(Model::named("TEST"));
    let context = Context::builder(&data).resolver(full_chain()).build();

    assert_eq!(render("{{title}} {{#if model.isOld}}OK{{/if}}", &context), "Title ");
    assert_eq!(render("{{title}} {{#if model.isNew}}OK{{/if}}", &context), "Title OK");
}

#[test]
fn test_combine() {
    let data = data().with_model(Model::named("TEST"));
    let context = Context::builder(&data)
        .combine("time", &"10")
        .resolver(full_chain())
        .build();

    let output = render(
        "{{time}} {{title}} {{getTitle}} {{model.name}} {{model.getName}} \
         {{#if model.isNew}}isNew{{/if}} {{#unless model.isOld}}isOld{{/unless}}",
        &context,
    );
    assert_eq!(output, "10 Title Title TEST TEST isNew isOld");
}

#[test]
fn test_combine_is_behind_model() {
    let context = Context::builder(&data()).combine("title", &"shadowed").build();
    assert_eq!(render("{{title}}", &context), "Title");
}

#[test]
fn test_map_of_records() {
    let data = data().with_model(Model::named("TEST"));
    let context = map_context(vec![
        ("data", data.to_value()),
        ("time", "10".to_value()),
        ("model", Model::named("Hello").to_value()),
    ]);

    let output = render(
        "{{model.hi}} {{model.getName}} {{time}} {{data.title}} {{data.getTitle}} \
         {{data.model.name}} {{data.model.getName}} {{#if data.model.isNew}}isNew{{/if}} \
         {{#unless data.model.isOld}}isOld{{/unless}}",
        &context,
    );
    assert_eq!(output, "hi Hello 10 Title Title TEST TEST isNew isOld");
}

#[test]
fn test_accessor_method_names() {
    let context = Context::builder(&data()).resolver(full_chain()).build();
    assert_eq!(render("Hello {{getTitle}}!", &context), "Hello Title!");
    assert_eq!(render("Hello {{title}}!", &context), "Hello Title!");

    let context = map_context(vec![("data", data().to_value())]);
    assert_eq!(render("Hello {{data.getTitle}}!", &context), "Hello Title!");
}

#[test]
fn test_each() {
    let list = vec![Data::titled("a"), Data::titled("b")];
    let context = map_context(vec![("dataList", list.to_value())]);

    assert_eq!(render("{{#each dataList}}{{title}}{{/each}}", &context), "ab");
    assert_eq!(render("{{#each dataList}}{{getTitle}}{{/each}}", &context), "ab");
    assert_eq!(render("{{#each dataList}}{{@index}}{{/each}}", &context), "01");
}

#[test]
fn test_each_locals() {
    let list = vec![Data::titled("a"), Data::titled("b"), Data::titled("c")];
    let context = map_context(vec![("dataList", list.to_value())]);

    let cases = [
        ("{{#each dataList}}{{@index}}{{/each}}", "012"),
        ("{{#each dataList}}{{@first}}{{/each}}", "first"),
        ("{{#each dataList}}{{@last}}{{/each}}", "last"),
        ("{{#each dataList}}{{@odd}}{{/each}}", "odd"),
        ("{{#each dataList}}{{@even}}{{/each}}", "eveneven"),
        ("{{#each dataList}}{{@index_1}}{{/each}}", "123"),
    ];
    for (template, expected) in cases {
        assert_eq!(render(template, &context), expected, "template: {}", template);
    }
}

#[test]
fn test_if_truthiness() {
    let empty = map_context(vec![]);
    assert_eq!(
        render("{{#if data.model.isNew}}OK{{else}}ERROR{{/if}}", &empty),
        "ERROR"
    );

    let mut data = Data::titled("a").with_model(Model::default());
    let context = |data: &Data| map_context(vec![("data", data.to_value())]);

    assert_eq!(render("{{#if true}}OK{{/if}}", &context(&data)), "OK");
    assert_eq!(render("{{#if false}}OK{{/if}}", &context(&data)), "");
    assert_eq!(render("{{#if data.model.isNew}}OK{{/if}}", &context(&data)), "OK");
    assert_eq!(
        render("{{#if data.model.isOld}}OK{{else}}ERROR{{/if}}", &context(&data)),
        "ERROR"
    );
    assert_eq!(render("{{#if data.title}}OK{{else}}ERROR{{/if}}", &context(&data)), "OK");
    assert_eq!(render("{{#if data.getTitle}}OK{{else}}ERROR{{/if}}", &context(&data)), "OK");

    data.title = Some(String::new());
    assert_eq!(render("{{#if data.title}}OK{{else}}ERROR{{/if}}", &context(&data)), "ERROR");
    assert_eq!(
        render("{{#if data.getTitle}}OK{{else}}ERROR{{/if}}", &context(&data)),
        "ERROR"
    );

    data.title = None;
    assert_eq!(render("{{#if data.title}}OK{{else}}ERROR{{/if}}", &context(&data)), "ERROR");
    assert_eq!(
        render("{{#if data.getTitle}}OK{{else}}ERROR{{/if}}", &context(&data)),
        "ERROR"
    );

    assert_eq!(render("{{#if data.age}}OK{{else}}ERROR{{/if}}", &context(&data)), "ERROR");
    data.age = Some(1);
    assert_eq!(render("{{#if data.age}}OK{{else}}ERROR{{/if}}", &context(&data)), "OK");
}

#[test]
fn test_dotted_path_fails_as_a_whole() {
    // `model` exists on the subject, so `model.title` must not fall back to
    // the root's `title`.
    let data = data().with_model(Model::named("TEST"));
    let template = handlebars()
        .compile_inline("[{{model.title}}][{{missing.name}}]")
        .unwrap();
    assert_eq!(template.apply(&data).unwrap(), "[][]");
}

#[test]
fn test_render_is_deterministic() {
    let data = data().with_model(Model::named("TEST"));
    let template = handlebars()
        .compile_inline("{{title}}{{#with model}}-{{name}}-{{title}}{{/with}}")
        .unwrap();
    let first = template.apply(&data).unwrap();
    assert_eq!(first, "Title-TEST-Title");
    for _ in 0..10 {
        assert_eq!(template.apply(&data).unwrap(), first);
    }
}

#[test]
fn test_template_is_shared_across_threads() {
    let template = handlebars().compile_inline("Hello {{this}}!").unwrap();
    let handles: Vec<_> = (0..4)
        .map(|i| {
            let template = template.clone();
            std::thread::spawn(move || template.apply(&i).unwrap())
        })
        .collect();
    for (i, handle) in handles.into_iter().enumerate() {
        assert_eq!(handle.join().unwrap(), format!("Hello {}!", i));
    }
}

#[derive(Record, Clone)]
struct Account {
    #[record("userName")]
    user_name: String,
    #[record(rename = "mail")]
    email: String,
    #[record(ignore)]
    password: String,
}

#[test]
fn test_record_field_names() {
    let account = Account {
        user_name: "ada".to_string(),
        email: "ada@example.com".to_string(),
        password: "secret".to_string(),
    };
    let template = handlebars()
        .compile_inline("{{userName}} {{mail}} [{{email}}][{{password}}]")
        .unwrap();
    assert_eq!(template.apply(&account).unwrap(), "ada ada@example.com [][]");
    assert_eq!(account.password, "secret");
}
