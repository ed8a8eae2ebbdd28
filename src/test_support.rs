use serde_json::{Value, json};

pub fn participant_json(champion: &str, kills: i64, deaths: i64, assists: i64) -> Value {
    json!({
        "puuid": format!("puuid-{}", champion.to_lowercase()),
        "riotIdGameName": champion,
        "riotIdTagline": "EUW",
        "summonerName": format!("{champion}Main"),
        "kills": kills,
        "deaths": deaths,
        "assists": assists,
        "goldEarned": 11250,
        "champExperience": 15400,
        "champLevel": 16,
        "championId": 103,
        "championName": champion,
        "totalMinionsKilled": 201,
        "neutralMinionsKilled": 12,
        "totalAllyJungleMinionsKilled": 0,
        "totalEnemyJungleMinionsKilled": 4,
        "visionScore": 23,
        "totalDamageDealtToChampions": 24890,
        "item0": "3089",
        "item1": "3020",
        "item2": "4645",
        "item3": "",
        "item4": "3135",
        "item5": "",
        "item6": "3363",
        "summoner1Id": "4",
        "summoner2Id": "14",
        "win": true,
        "teamId": 100,
        "perks": {
            "statPerks": { "defense": 5001, "flex": 5008, "offense": 5005 },
            "styles": [
                {
                    "description": "primaryStyle",
                    "style": "8100",
                    "selections": [{ "perk": "8112" }, { "perk": "8139" }]
                },
                {
                    "description": "subStyle",
                    "style": "8200",
                    "selections": [{ "perk": "8226" }]
                }
            ]
        }
    })
}

pub fn sample_match() -> Value {
    let mut jinx = participant_json("Jinx", 2, 7, 4);
    jinx["win"] = json!(false);
    jinx["teamId"] = json!(200);
    jinx["goldEarned"] = json!(8400);

    json!({
        "metadata": {
            "dataVersion": "2",
            "matchId": "EUW1_7000000001",
            "participants": ["puuid-ahri", "puuid-jinx"]
        },
        "info": {
            "endOfGameResult": "GameComplete",
            "gameCreation": 1_700_000_000_000i64,
            "gameDuration": 1845,
            "gameStartTimestamp": 1_700_000_035_000i64,
            "gameEndTimestamp": 1_700_001_880_000i64,
            "gameId": 7000000001i64,
            "gameMode": "CLASSIC",
            "gameVersion": "14.22.628.4416",
            "queueId": 420,
            "participants": [participant_json("Ahri", 9, 3, 11), jinx]
        }
    })
}

pub fn to_payload(value: &Value) -> Vec<u8> {
    serde_json::to_vec(value).unwrap()
}
