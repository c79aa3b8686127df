// Shared by several bench targets; each only uses part of it.
#[allow(dead_code)]
pub fn generate_html(sections: usize) -> String {
    let section = concat!(
        "<h2>Section</h2>",
        "<p>Paragraph with <strong>bold</strong>, <em>italic</em> and ",
        "<a href=\"https://example.com\">a link</a>.</p>",
        "<ul><li><p>Bullet point</p></li><li><p>Another <code>item</code></p></li></ul>",
        "<pre><code class=\"language-rust\">fn example() {\n    println!(\"Hello\");\n}</code></pre>",
        "<table><tbody><tr><th><p>a</p></th><th><p>b</p></th></tr>",
        "<tr><td><p>1</p></td><td><p>2</p></td></tr></tbody></table>",
    );
    section.repeat(sections)
}

#[allow(dead_code)]
pub fn generate_messy_html(sections: usize) -> String {
    let section = concat!(
        "<div class=\"x\">\n  <b>Loose</b> text\n  <font>wrapped</font>\n</div>\n",
        "<p>Unclosed <i>italic\n<p>Next &amp; more &nbsp;text\n",
        "<ul>\n  <li>one\n  <li>two\n</ul>\n",
        "<table><tr><td>a<td>b<tr><td>c</table>\n",
    );
    section.repeat(sections)
}
