use buildscope_protocol::ExperimentKind;
use buildscope_syntax::{evaluate_literal, ExperimentExtractor};
use serde_json::json;

const BUNDLE: &str = r#"
(this.webpackChunkdiscord_app=this.webpackChunkdiscord_app||[]).push([[7151],{
  123456:function(e,t,n){"use strict";n.r(t);var i=n(654321),r=n(111);
    t.default=(0,i.B)({kind:"guild",id:"2022-07_voice_rooms",label:"Voice Rooms",
      defaultConfig:{enabled:!1},
      treatments:[{id:1,label:"Rooms on",config:{enabled:!0,limit:25}},
                  {id:2,label:"Rooms with cap",config:{enabled:!0,limit:r.Limits.SMALL}}]})
  },
  654322:function(e,t,n){
    var a={kind:"user",id:"2023-02_profile_effects",label:"Profile Effects",defaultConfig:{},treatments:[]};
    var b={kind:"user",id:"2022-07_voice_rooms",label:"Shadowed duplicate",treatments:[]};
    e.exports={experiment:a,other:b};
  }
}]);
"#;

#[test]
fn extracts_experiments_from_a_chunk() {
    let experiments = ExperimentExtractor::new()
        .expect("parser")
        .extract(BUNDLE)
        .expect("bundle parses");

    let ids: Vec<_> = experiments.iter().map(|e| e.id.as_str()).collect();
    assert_eq!(ids, vec!["2022-07_voice_rooms", "2023-02_profile_effects"]);

    let rooms = &experiments[0];
    assert_eq!(rooms.kind, ExperimentKind::Guild);
    assert_eq!(rooms.label, "Voice Rooms");
    assert_eq!(rooms.default_config, Some(json!({ "enabled": false })));
    assert_eq!(rooms.treatments.len(), 2);
    assert_eq!(
        rooms.treatments[1].config,
        json!({ "enabled": true, "limit": "SMALL" })
    );

    let effects = &experiments[1];
    assert_eq!(effects.kind, ExperimentKind::User);
    assert!(effects.treatments.is_empty());
}

#[test]
fn extractor_instance_is_reusable_after_a_failure() {
    let mut extractor = ExperimentExtractor::new().expect("parser");
    assert!(extractor.extract("var = ;").is_err());
    let experiments = extractor
        .extract(r#"f({kind:"user",id:"after",label:"After"})"#)
        .expect("second parse");
    assert_eq!(experiments.len(), 1);
}

#[test]
fn loader_mapping_literal_evaluates() {
    let mapping = evaluate_literal(
        "{12:\"0123456789abcdef0123\",1e3:\"fedcba9876543210fedc\",\n77:\"00000000000000000000\"}",
    )
    .expect("mapping evaluates");
    assert_eq!(mapping["1000"], json!("fedcba9876543210fedc"));
    assert_eq!(mapping.as_object().map(|m| m.len()), Some(3));
}
