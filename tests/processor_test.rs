use std::fs;
use std::path::Path;

use gtml::config::build_filter;
use gtml::context::{Context, Options};
use gtml::deps::Makefile;
use gtml::error::Error;
use gtml::processor::process_file;
use pretty_assertions::assert_eq;
use tempfile::TempDir;

fn write(dir: &Path, name: &str, content: &str) {
    let path = dir.join(name);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(path, content).unwrap();
}

fn read(dir: &Path, name: &str) -> String {
    fs::read_to_string(dir.join(name)).unwrap()
}

#[test_log::test]
fn test_macros_and_arguments() {
    let dir = TempDir::new().unwrap();
    write(
        dir.path(),
        "index.gtm",
        "#define TITLE Home\n\
         #define LINK(URL,TEXT) <a href=\"URL\">TEXT</a>\n\
         <h1><<TITLE>></h1>\n\
         <<LINK(about.html,About us)>>\n",
    );

    let mut ctx = Context::new(dir.path());
    process_file(&mut ctx, "index.gtm").unwrap();

    assert_eq!(
        read(dir.path(), "index.html"),
        "<h1>Home</h1>\n<a href=\"about.html\">About us</a>\n"
    );
    assert_eq!(ctx.diagnostics.warnings(), 0);
}

#[test]
fn test_conditionals() {
    let dir = TempDir::new().unwrap();
    write(
        dir.path(),
        "page.gtm",
        "#define LANG fr\n\
         #if LANG == fr\n\
         Bonjour\n\
         #elsif LANG == de\n\
         Hallo\n\
         #else\n\
         Hello\n\
         #endif\n\
         #ifdef MISSING\n\
         never\n\
         #endif\n\
         #ifndef MISSING\n\
         shown\n\
         #endif\n",
    );

    let mut ctx = Context::new(dir.path());
    process_file(&mut ctx, "page.gtm").unwrap();

    assert_eq!(read(dir.path(), "page.html"), "Bonjour\nshown\n");
    assert!(!ctx.diagnostics.failed());
}

#[test]
fn test_condition_on_substituted_operand() {
    let dir = TempDir::new().unwrap();
    write(
        dir.path(),
        "page.gtm",
        "#define LANG fr\n\
         #define fr French\n\
         #if <<LANG>> == fr\n\
         yes\n\
         #else\n\
         no\n\
         #endif\n",
    );

    let mut ctx = Context::new(dir.path());
    process_file(&mut ctx, "page.gtm").unwrap();

    assert_eq!(read(dir.path(), "page.html"), "yes\n");
}

#[test]
fn test_define_variants() {
    let dir = TempDir::new().unwrap();
    write(
        dir.path(),
        "page.gtm",
        "#define M(x) [x]\n\
         #define+ M(y) (y)\n\
         <<M(1,2)>>\n\
         #newdefine N one\n\
         #newdefine N two\n\
         <<N>>\n\
         #define A b\n\
         #define! B <<A>>x\n\
         #define A c\n\
         <<B>>\n\
         #newdefine! C z\n\
         #newdefine! C <<N>>\n\
         <<C>>\n\
         #define P <<N>>+1\n\
         #define N uno\n\
         <<P>>\n\
         #undef A\n\
         #ifdef A\n\
         still defined\n\
         #endif\n",
    );

    let mut ctx = Context::new(dir.path());
    process_file(&mut ctx, "page.gtm").unwrap();

    assert_eq!(read(dir.path(), "page.html"), "[1](2)\none\nbx\nz\nuno+1\n");
    assert_eq!(ctx.diagnostics.warnings(), 0);
    assert!(!ctx.diagnostics.failed());
}

#[test]
fn test_call_arguments_are_trimmed() {
    let dir = TempDir::new().unwrap();
    write(
        dir.path(),
        "page.gtm",
        "#define PAIR(A,B) [A|B]\n<<PAIR( left , right )>> <<PAIR(' x ', y)>>\n",
    );

    let mut ctx = Context::new(dir.path());
    process_file(&mut ctx, "page.gtm").unwrap();

    assert_eq!(read(dir.path(), "page.html"), "[left|right] [ x |y]\n");
}

#[test]
fn test_unmatched_endif_is_reported() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "page.gtm", "before\n#endif\nafter\n");

    let mut ctx = Context::new(dir.path());
    process_file(&mut ctx, "page.gtm").unwrap();

    assert_eq!(read(dir.path(), "page.html"), "before\nafter\n");
    assert_eq!(ctx.diagnostics.errors(), 1);
}

#[test]
fn test_include_records_dependencies() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "x.gtm", "#include \"y.inc\"\nbody\n");
    write(dir.path(), "y.inc", "included\n");

    let mut ctx = Context::new(dir.path());
    process_file(&mut ctx, "x.gtm").unwrap();

    assert_eq!(read(dir.path(), "x.html"), "included\nbody\n");
    assert_eq!(ctx.deps.prerequisites("x.html"), ["x.gtm"]);
    assert_eq!(ctx.deps.prerequisites("x.gtm"), ["y.inc"]);
}

#[test]
fn test_include_path_search() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "pages/x.gtm", "#include <footer.inc>\n");
    write(dir.path(), "common/footer.inc", "<footer><<ROOT_PATH>></footer>\n");

    let mut ctx = Context::new(dir.path());
    ctx.define("INCLUDE_PATH", "common");
    process_file(&mut ctx, "pages/x.gtm").unwrap();

    assert_eq!(read(dir.path(), "pages/x.html"), "<footer>../</footer>\n");
    assert_eq!(ctx.deps.prerequisites("pages/x.gtm"), ["common/footer.inc"]);
}

#[test]
fn test_missing_include_is_error() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "x.gtm", "#include nowhere.inc\nbody\n");

    let mut ctx = Context::new(dir.path());
    process_file(&mut ctx, "x.gtm").unwrap();

    assert_eq!(read(dir.path(), "x.html"), "body\n");
    assert_eq!(ctx.diagnostics.errors(), 1);
}

#[test]
fn test_self_include_stops() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "loop.gtm", "#include loop.gtm\n");

    let mut ctx = Context::new(dir.path());
    process_file(&mut ctx, "loop.gtm").unwrap();

    assert_eq!(ctx.diagnostics.errors(), 1);
}

#[test]
fn test_include_literal() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "x.gtm", "<pre>\n#includeliteral code.txt\n</pre>\n");
    write(dir.path(), "code.txt", "#define X 1\n<<X>>");

    let mut ctx = Context::new(dir.path());
    process_file(&mut ctx, "x.gtm").unwrap();

    assert_eq!(read(dir.path(), "x.html"), "<pre>\n#define X 1\n<<X>>\n</pre>\n");
    assert!(ctx.lookup("X").is_none());
}

#[test]
fn test_fast_mode_skips_up_to_date() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "a.gtm", "first\n");

    let mut ctx = Context::new(dir.path());
    process_file(&mut ctx, "a.gtm").unwrap();
    assert_eq!(ctx.diagnostics.warnings(), 0);

    let options = Options { fast: true, ..Options::default() };
    let mut ctx = Context::new(dir.path()).with_options(options);
    process_file(&mut ctx, "a.gtm").unwrap();

    assert_eq!(ctx.diagnostics.warnings(), 1);
    assert_eq!(read(dir.path(), "a.html"), "first\n");
    assert_eq!(ctx.deps.prerequisites("a.html"), ["a.gtm"]);
}

#[test]
fn test_scope_is_restored_between_files() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "a.gtm", "#define LOCAL a\n#compress on\n<<LOCAL>>\n");
    write(dir.path(), "b.gtm", "#ifdef LOCAL\nleaked\n#endif\n  clean  \n");

    let mut ctx = Context::new(dir.path());
    process_file(&mut ctx, "a.gtm").unwrap();
    process_file(&mut ctx, "b.gtm").unwrap();

    assert_eq!(read(dir.path(), "a.html"), "a\n");
    assert_eq!(read(dir.path(), "b.html"), "  clean  \n");
    assert!(ctx.lookup("LOCAL").is_none());
    assert!(ctx.lookup("BASENAME").is_none());
    assert!(!ctx.settings().compress);
}

#[test]
fn test_file_macros() {
    let dir = TempDir::new().unwrap();
    write(
        dir.path(),
        "docs/guide.gtm",
        "<<ROOT_PATH>>|<<BASENAME>>|<<FILENAME>>|<<SRC_FILENAME>>|<<PATHNAME>>\n",
    );

    let mut ctx = Context::new(dir.path());
    process_file(&mut ctx, "docs/guide.gtm").unwrap();

    assert_eq!(
        read(dir.path(), "docs/guide.html"),
        "../|guide|guide.html|guide.gtm|docs\n"
    );
}

#[test]
fn test_literal_mode() {
    let dir = TempDir::new().unwrap();
    write(
        dir.path(),
        "page.gtm",
        "#define Y why\n\
         #literal on\n\
         #define X 1\n\
         <<Y>>\n\
         #literal off\n\
         #ifdef X\n\
         defined\n\
         #endif\n",
    );

    let mut ctx = Context::new(dir.path());
    process_file(&mut ctx, "page.gtm").unwrap();

    assert_eq!(read(dir.path(), "page.html"), "#define X 1\nwhy\n");
}

#[test]
fn test_compression() {
    let dir = TempDir::new().unwrap();
    write(
        dir.path(),
        "page.gtm",
        "<p>\n#compress on\n  <b>bold</b>\n\ttext\n#compress off\n</p>\n",
    );

    let mut ctx = Context::new(dir.path());
    process_file(&mut ctx, "page.gtm").unwrap();

    assert_eq!(read(dir.path(), "page.html"), "<p>\n<b>bold</b> text\n</p>\n");
}

#[test]
fn test_entities_and_character_map() {
    let dir = TempDir::new().unwrap();
    write(
        dir.path(),
        "page.gtm",
        "#define WHO Tom\n#entities on\n#definechar é &eacute;\nété & <<WHO>> <b>\n",
    );

    let mut ctx = Context::new(dir.path());
    process_file(&mut ctx, "page.gtm").unwrap();

    assert_eq!(read(dir.path(), "page.html"), "&eacute;t&eacute; &amp; Tom &lt;b&gt;\n");
}

#[test]
fn test_continuation_lines() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "page.gtm", "#define LIST one \\\ntwo\n<<LIST>>\n");

    let mut ctx = Context::new(dir.path());
    process_file(&mut ctx, "page.gtm").unwrap();

    assert_eq!(read(dir.path(), "page.html"), "one two\n");
}

#[test]
fn test_absolute_path_is_rejected() {
    let dir = TempDir::new().unwrap();
    let mut ctx = Context::new(dir.path());
    let err = process_file(&mut ctx, "/etc/page.gtm").unwrap_err();
    assert!(matches!(err, Error::AbsolutePathError { .. }));
}

#[test]
fn test_output_over_source_is_rejected() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "page.html", "<p></p>\n");
    let mut ctx = Context::new(dir.path());
    let err = process_file(&mut ctx, "page.html").unwrap_err();
    assert!(matches!(err, Error::OutputIsInputError { .. }));
}

#[test]
fn test_makefile_mode_writes_nothing() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "site.gtp", "a.gtm\n");
    write(dir.path(), "a.gtm", "#include part.inc\n");
    write(dir.path(), "part.inc", "part\n");

    let options = Options { makefile: true, ..Options::default() };
    let mut ctx = Context::new(dir.path()).with_options(options);
    process_file(&mut ctx, "site.gtp").unwrap();

    assert!(!dir.path().join("a.html").exists());
    let makefile = Makefile::new(&ctx.deps, "gtml").to_string();
    assert!(makefile.contains("all: a.html\n"));
    assert!(makefile.contains("a.html: a.gtm\n\tgtml -F a.gtm site.gtp\n"));
    assert!(makefile.contains("a.gtm: part.inc\n"));
}

#[test]
fn test_project_filter_and_aliases() {
    let dir = TempDir::new().unwrap();
    write(
        dir.path(),
        "site.gtp",
        "filename home pages/index.gtm\nhome\nb.gtm\nc.gtm\n",
    );
    write(dir.path(), "pages/index.gtm", "index\n");
    write(dir.path(), "b.gtm", "b\n");
    write(dir.path(), "c.gtm", "c\n");

    let filter = build_filter(&["pages/*".to_string(), "c.gtm".to_string()]).unwrap();
    let options = Options { filter, ..Options::default() };
    let mut ctx = Context::new(dir.path()).with_options(options);
    process_file(&mut ctx, "site.gtp").unwrap();

    assert_eq!(read(dir.path(), "pages/index.html"), "index\n");
    assert!(!dir.path().join("b.html").exists());
    assert_eq!(read(dir.path(), "c.html"), "c\n");
}

#[test]
fn test_allsource() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "site.gtp", "define SITE demo\nallsource\n");
    write(dir.path(), "a.gtm", "<<SITE>> a\n");
    write(dir.path(), "sub/b.gtml", "<<SITE>> b\n");
    write(dir.path(), "notes.txt", "not a source\n");

    let mut ctx = Context::new(dir.path());
    process_file(&mut ctx, "site.gtp").unwrap();

    assert_eq!(read(dir.path(), "a.html"), "demo a\n");
    assert_eq!(read(dir.path(), "sub/b.html"), "demo b\n");
    assert!(!dir.path().join("notes.html").exists());
    assert!(!ctx.diagnostics.failed());
}

#[test]
fn test_output_directory_and_extension() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "site.gtp", "define OUTPUT_DIR public\ndefine EXTENSION php\npage.gtm\n");
    write(dir.path(), "page.gtm", "<<FILENAME>>\n");

    let mut ctx = Context::new(dir.path());
    process_file(&mut ctx, "site.gtp").unwrap();

    assert_eq!(read(dir.path(), "public/page.php"), "page.php\n");
}
