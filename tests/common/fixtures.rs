pub const DEVICE_INFO: &str = r#"<?xml version="1.0" encoding="UTF-8" ?>
<device-info>
	<udn>29380010-0800-1054-80a3-d83134c2d66d</udn>
	<serial-number>X00400ABCDEF</serial-number>
	<model-name>Roku Ultra</model-name>
	<model-number>4800X</model-number>
	<software-version>11.5.0</software-version>
	<software-build>4312</software-build>
	<developer-enabled>true</developer-enabled>
	<friendly-device-name>Living Room</friendly-device-name>
	<keyed-developer-id/>
</device-info>
"#;

pub const MEDIA_PLAYER: &str = r#"<?xml version="1.0" encoding="UTF-8" ?>
<player error="false" state="play">
	<plugin bandwidth="15000000 bps" id="dev" name="Test Channel"/>
	<format audio="aac_adts" captions="none" container="hls" drm="none" video="mpeg4_10b"/>
	<buffering current="1000" max="1000" target="0"/>
	<position>12345 ms</position>
	<duration>600000 ms</duration>
	<is_live>false</is_live>
</player>
"#;

/// The single screen from the classic two-item example.
pub const TWO_ITEMS: &str = r#"<?xml version="1.0" encoding="UTF-8" ?>
<app-ui>
	<screen focused="true">
		<RowList name="row" focused="true" layoutDirection="horiz">
			<Button name="item1" text="Play" focused="true" focusable="true" bounds="{0, 0, 100, 50}"/>
			<Button name="item2" text="Settings" focused="false" focusable="true" bounds="{200, 0, 100, 50}"/>
		</RowList>
	</screen>
</app-ui>
"#;

/// Nested layout used by locator tests: a header label, two rows of
/// posters and a poster with a nested label.
pub const CATALOG: &str = r#"<?xml version="1.0" encoding="UTF-8" ?>
<app-ui>
	<topscreen>
		<plugin id="dev" name="Catalog"/>
		<screen focused="true">
			<Label name="header" text="Featured" bounds="{0, 0, 1920, 80}"/>
			<RowList name="rows" focused="true">
				<Row name="movies" focused="true">
					<Poster name="m1" title="Alpha" focusable="true" focused="true" bounds="{0, 100, 300, 400}"/>
					<Poster name="m2" title="Beta" focusable="true" bounds="{320, 100, 300, 400}"/>
					<Poster name="m3" title="Gamma Ray" focusable="true" bounds="{640, 100, 300, 400}"/>
				</Row>
				<Row name="shows">
					<Poster name="s1" title="Delta" focusable="true" bounds="{0, 520, 300, 400}"/>
					<Poster name="s2" title="Epsilon" focusable="true" visible="false" bounds="{320, 520, 300, 400}">
						<Label text="New"/>
						<Label text="Season 2"/>
					</Poster>
				</Row>
			</RowList>
		</screen>
	</topscreen>
</app-ui>
"#;

pub fn apps_xml(installed: &[(String, String)]) -> String {
    let mut xml = String::from("<?xml version=\"1.0\" encoding=\"UTF-8\" ?>\n<apps>\n");
    for (id, name) in installed {
        xml.push_str(&format!(
            "\t<app id=\"{}\" type=\"appl\" version=\"1.0.0\">{}</app>\n",
            id, name
        ));
    }
    xml.push_str("</apps>\n");
    xml
}

pub fn active_app_xml(active: &str, name: Option<&str>) -> String {
    if active.is_empty() {
        return "<?xml version=\"1.0\" encoding=\"UTF-8\" ?>\n<active-app>\n\t<app>Roku</app>\n</active-app>\n"
            .to_string();
    }
    format!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\" ?>\n<active-app>\n\t<app id=\"{}\" type=\"appl\" version=\"1.0.0\">{}</app>\n</active-app>\n",
        active,
        name.unwrap_or("")
    )
}
