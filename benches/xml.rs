#[macro_use]
extern crate bencher;

extern crate sgmltree;

use bencher::Bencher;

const MEDIUM: &str = include_str!("medium.xml");

fn parse_medium(bencher: &mut Bencher) {
    bencher.iter(|| sgmltree::parse_str(MEDIUM, sgmltree::ParserOptions::default()).unwrap())
}

fn parse_medium_validating(bencher: &mut Bencher) {
    let xml = r#"<!DOCTYPE root [
<!ELEMENT root (item)*>
<!ELEMENT item (#PCDATA)>
<!ATTLIST item id CDATA #REQUIRED>
]>
"#
    .to_string()
        + MEDIUM;
    bencher.iter(|| sgmltree::parse_str(&xml, sgmltree::ParserOptions::validating()).unwrap())
}

fn serialize_medium(bencher: &mut Bencher) {
    let doc = sgmltree::parse_str(MEDIUM, sgmltree::ParserOptions::default()).unwrap();
    bencher.iter(|| sgmltree::to_string(&doc))
}

benchmark_group!(benches, parse_medium, parse_medium_validating, serialize_medium);
benchmark_main!(benches);
