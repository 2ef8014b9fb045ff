use serde_json::{json, Value};

/// Dataset id the layer below binds to.
pub const DATASET_ID: &str = "data";

/// Saved kepler.gl configuration for the jobs hex layer.
///
/// Hex ids come from the `cell` column; colour and elevation both follow
/// `jobs`. Dark basemap, viewport over South Florida. The document is owned
/// by the widget's schema and is passed through untouched.
pub fn kepler_map_config() -> Value {
    json!({
        "version": "v1",
        "config": {
            "visState": {
                "filters": [],
                "layers": [
                    {
                        "id": "data",
                        "type": "hexagonId",
                        "config": {
                            "dataId": DATASET_ID,
                            "label": "Data",
                            "color": [255, 203, 153],
                            "highlightColor": [252, 242, 26, 255],
                            "columns": {"hex_id": "cell"},
                            "isVisible": true,
                            "visConfig": {
                                "colorRange": {
                                    "name": "ColorBrewer YlGn-6",
                                    "type": "sequential",
                                    "category": "ColorBrewer",
                                    "colors": ["#ffffcc", "#d9f0a3", "#addd8e", "#78c679", "#31a354", "#006837"]
                                },
                                "filled": true,
                                "opacity": 0.8,
                                "outline": false,
                                "strokeColor": null,
                                "strokeColorRange": {
                                    "name": "Global Warming",
                                    "type": "sequential",
                                    "category": "Uber",
                                    "colors": ["#5A1846", "#900C3F", "#C70039", "#E3611C", "#F1920E", "#FFC300"]
                                },
                                "strokeOpacity": 0.8,
                                "thickness": 2,
                                "coverage": 1,
                                "enable3d": true,
                                "sizeRange": [0, 500],
                                "coverageRange": [0, 1],
                                "elevationScale": 5,
                                "enableElevationZoomFactor": true
                            },
                            "hidden": false,
                            "textLabel": [
                                {
                                    "field": null,
                                    "color": [255, 255, 255],
                                    "size": 18,
                                    "offset": [0, 0],
                                    "anchor": "middle",
                                    "alignment": "center",
                                    "outlineWidth": 0,
                                    "outlineColor": [255, 0, 0, 255],
                                    "background": false,
                                    "backgroundColor": [0, 0, 200, 255]
                                }
                            ]
                        },
                        "visualChannels": {
                            "colorField": {"name": "jobs", "type": "integer"},
                            "colorScale": "quantile",
                            "strokeColorField": null,
                            "strokeColorScale": "quantile",
                            "sizeField": {"name": "jobs", "type": "integer"},
                            "sizeScale": "linear",
                            "coverageField": null,
                            "coverageScale": "linear"
                        }
                    }
                ],
                "effects": [],
                "interactionConfig": {
                    "tooltip": {
                        "fieldsToShow": {
                            "-53x0gu": [
                                {"name": "2", "format": null},
                                {"name": "cell", "format": null},
                                {"name": "jobs", "format": null}
                            ]
                        },
                        "compareMode": false,
                        "compareType": "absolute",
                        "enabled": true
                    },
                    "brush": {"size": 0.5, "enabled": false},
                    "geocoder": {"enabled": false},
                    "coordinate": {"enabled": false}
                },
                "layerBlending": "normal",
                "overlayBlending": "normal",
                "splitMaps": [],
                "animationConfig": {"currentTime": null, "speed": 1},
                "editor": {"features": [], "visible": true}
            },
            "mapState": {
                "bearing": 0,
                "dragRotate": false,
                "latitude": 25.98112631733372,
                "longitude": -80.21566191956265,
                "pitch": 0,
                "zoom": 9.261701808045437,
                "isSplit": false,
                "isViewportSynced": true,
                "isZoomLocked": false,
                "splitMapViewports": []
            },
            "mapStyle": {
                "styleType": "dark",
                "topLayerGroups": {},
                "visibleLayerGroups": {
                    "label": true,
                    "road": true,
                    "border": false,
                    "building": true,
                    "water": true,
                    "land": true,
                    "3d building": false
                },
                "threeDBuildingColor": [15.035172933000911, 15.035172933000911, 15.035172933000911],
                "backgroundColor": [0, 0, 0],
                "mapStyles": {}
            }
        }
    })
}
